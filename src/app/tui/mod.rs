mod render;
mod term;

use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use super::catalog::{Catalog, format_posted_display};
use super::chain::{ChainEndPolicy, Chains, build_chains};
use super::gesture::GestureThresholds;
use super::session::{OutboundEvent, ViewerSession};
use super::viewed::ViewedMemory;

use self::render::{draw_browser, draw_viewer};
use self::term::TermGuard;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Advisory starting point: shareable group id plus optional story index,
/// always re-validated against the eligible set.
#[derive(Debug, Clone)]
pub(crate) struct DeepLink {
    pub(crate) group_id: String,
    pub(crate) story_index: Option<usize>,
}

pub(super) struct BrowserRow {
    pub(super) group_id: String,
    pub(super) author: String,
    pub(super) title: String,
    pub(super) pinned: bool,
    pub(super) story_count: usize,
    pub(super) unseen: bool,
    pub(super) age: String,
}

pub(crate) fn run_tui(
    feed_source: &str,
    policy: ChainEndPolicy,
    deep_link: Option<DeepLink>,
) -> Result<()> {
    let catalog = super::load_catalog(feed_source)?;
    if catalog.groups().is_empty() {
        println!("Feed has no playable story groups.");
        return Ok(());
    }

    let (mut viewed, load_warning) = super::load_viewed_memory()?;

    // No explicit deep link: a stored location from a previous run is an
    // advisory resume point.
    let deep_link = deep_link.or_else(|| {
        super::open_db()
            .ok()
            .and_then(|db| db.location().ok().flatten())
            .map(|loc| DeepLink {
                group_id: loc.group_id,
                story_index: Some(loc.story_index),
            })
    });

    let mut guard = TermGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut chains = build_chains(catalog.groups(), &viewed);
    let mut rows = build_browser_rows(&catalog, &viewed, &chains);
    let mut table_state = TableState::default();
    table_state.select((!rows.is_empty()).then_some(0));

    let mut status = match load_warning {
        Some(warning) => status_error(&warning),
        None => status_info("Ready."),
    };
    let mut session: Option<ViewerSession> = None;
    let mut groups_viewed: usize = 0;

    if let Some(link) = deep_link {
        session = ViewerSession::open(
            &catalog,
            &mut viewed,
            &chains,
            &link.group_id,
            link.story_index,
            policy,
            GestureThresholds::cell_scaled(),
            Instant::now(),
        );
        if session.is_none() {
            status = status_error(&format!("Group {} is no longer available.", link.group_id));
        }
    }

    loop {
        let now = Instant::now();

        if let Some(active) = session.as_mut() {
            active.poll(&catalog, &mut viewed, now);
            groups_viewed += drain_events(active);
            if let Some(message) = active.take_status() {
                status = status_info(&message);
            }
            if active.is_closed() {
                let last_group = active.active_group().to_string();
                session = None;
                chains = build_chains(catalog.groups(), &viewed);
                rows = build_browser_rows(&catalog, &viewed, &chains);
                // Land back on the group the viewer just left.
                let selected = rows
                    .iter()
                    .position(|row| row.group_id == last_group)
                    .or_else(|| (!rows.is_empty()).then_some(0));
                table_state.select(selected);
                status = status_info("Ready.");
            }
        }

        match session.as_ref().and_then(|active| active.frame(&catalog)) {
            Some(view) => terminal.draw(|frame| draw_viewer(frame, &view, &status))?,
            None => {
                terminal.draw(|frame| draw_browser(frame, &rows, &mut table_state, &status))?
            }
        };

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        let surface_width = terminal.size().map(|size| size.width).unwrap_or(80) as f64;
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let now = Instant::now();
                if let Some(active) = session.as_mut() {
                    match key.code {
                        KeyCode::Left => active.retreat_story(&catalog, &mut viewed, now),
                        KeyCode::Right => active.advance_story(&catalog, &mut viewed, now),
                        KeyCode::Char(' ') => active.toggle_pause(now),
                        KeyCode::Esc | KeyCode::Char('q') => active.close(&mut viewed),
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Up => {
                            if let Some(selected) = table_state.selected() {
                                table_state.select(Some(selected.saturating_sub(1)));
                            }
                        }
                        KeyCode::Down => {
                            if let Some(selected) = table_state.selected()
                                && !rows.is_empty()
                            {
                                let next = (selected + 1).min(rows.len() - 1);
                                table_state.select(Some(next));
                            }
                        }
                        KeyCode::Enter => {
                            let Some(selected) = table_state.selected() else {
                                continue;
                            };
                            let Some(row) = rows.get(selected) else {
                                continue;
                            };
                            session = ViewerSession::open(
                                &catalog,
                                &mut viewed,
                                &chains,
                                &row.group_id,
                                None,
                                policy,
                                GestureThresholds::cell_scaled(),
                                now,
                            );
                            if session.is_none() {
                                status = status_error("Group is no longer available.");
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Mouse(mouse) => {
                if let Some(active) = session.as_mut() {
                    handle_mouse(active, &catalog, &mut viewed, mouse, surface_width);
                }
            }
            _ => {}
        }
    }

    terminal.show_cursor()?;
    guard.leave()?;
    if groups_viewed > 0 {
        println!("Viewed {groups_viewed} story group(s) this session.");
    }
    Ok(())
}

fn handle_mouse(
    session: &mut ViewerSession,
    catalog: &Catalog,
    viewed: &mut ViewedMemory,
    mouse: MouseEvent,
    surface_width: f64,
) {
    let now = Instant::now();
    let (x, y) = (mouse.column as f64, mouse.row as f64);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => session.on_pointer_down(x, y, now),
        MouseEventKind::Drag(MouseButton::Left) => session.on_pointer_move(x, y),
        MouseEventKind::Up(MouseButton::Left) => {
            session.on_pointer_up(catalog, viewed, x, y, now, surface_width);
        }
        _ => {}
    }
}

fn drain_events(session: &mut ViewerSession) -> usize {
    // "Content viewed" notifications are fire-and-forget; the TUI only keeps
    // a session tally.
    session
        .take_events()
        .into_iter()
        .filter(|event| matches!(event, OutboundEvent::ContentViewed { .. }))
        .count()
}

fn build_browser_rows(
    catalog: &Catalog,
    viewed: &ViewedMemory,
    chains: &Chains,
) -> Vec<BrowserRow> {
    let now = Utc::now();
    chains
        .display_order()
        .filter_map(|group_id| {
            let group = catalog.group(group_id)?;
            let author = catalog.author_for_group(group);
            Some(BrowserRow {
                group_id: group.id.clone(),
                author: author
                    .map(|author| author.name.clone())
                    .unwrap_or_else(|| "-".to_string()),
                title: group
                    .title
                    .clone()
                    .unwrap_or_else(|| "Recent".to_string()),
                pinned: group.is_pinned,
                story_count: group.stories.len(),
                unseen: viewed.is_unseen(&group.id, &group.latest_story().id),
                age: format_posted_display(group.latest_story().posted_at, group.is_pinned, now),
            })
        })
        .collect()
}

fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}
