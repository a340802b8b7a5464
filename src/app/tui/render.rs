use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use super::super::catalog::truncate;
use super::super::session::ViewFrame;
use super::BrowserRow;

pub(super) fn draw_browser(
    frame: &mut Frame,
    rows: &[BrowserRow],
    table_state: &mut TableState,
    status: &str,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let unseen_count = rows.iter().filter(|row| row.unseen).count();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "STORYTRACK",
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} groups", rows.len()),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{unseen_count} unseen"),
            Style::default().fg(Color::Yellow),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Stories"));
    frame.render_widget(header, chunks[0]);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let marker = if row.unseen { "●" } else { " " };
            let marker_style = if row.unseen {
                Style::default().fg(Color::Rgb(110, 170, 255))
            } else {
                Style::default().fg(Color::Rgb(105, 115, 130))
            };
            let pin = if row.pinned { "PIN" } else { "" };
            Row::new(vec![
                Cell::from(Span::styled(marker, marker_style)),
                Cell::from(truncate(&row.author, 24)),
                Cell::from(truncate(&row.title, 28)),
                Cell::from(row.story_count.to_string()),
                Cell::from(row.age.clone()),
                Cell::from(pin),
            ])
        })
        .collect();

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(2),
            Constraint::Percentage(30),
            Constraint::Percentage(36),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(4),
        ],
    )
    .header(
        Row::new(vec!["", "Author", "Title", "Stories", "Posted", ""]).style(
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block("Circles"))
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(110, 170, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, chunks[1], table_state);

    let controls = Paragraph::new("↑/↓ move   Enter open   q quit")
        .style(Style::default().fg(Color::Rgb(185, 195, 210)))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);
}

pub(super) fn draw_viewer(frame: &mut Frame, view: &ViewFrame<'_>, status: &str) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    // Long-press hides the chrome (progress + header); the media panel stays.
    if !view.chrome_hidden {
        let bar = Paragraph::new(progress_line(view, chunks[0].width));
        frame.render_widget(bar, chunks[0]);

        let author_name = view
            .author
            .map(|author| author.name.as_str())
            .or(view.group.title.as_deref())
            .unwrap_or("Recent");
        let mut spans = vec![Span::styled(
            author_name.to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )];
        if view.author.is_some_and(|author| author.is_verified) {
            spans.push(Span::styled(" ✔", Style::default().fg(Color::Rgb(110, 170, 255))));
        }
        if let Some(author) = view.author {
            spans.push(Span::styled(
                format!("  @{}", author.slug),
                Style::default().fg(Color::Rgb(140, 150, 165)),
            ));
        }
        if view.group.is_pinned {
            spans.push(Span::styled(
                "  PINNED",
                Style::default().fg(Color::Rgb(212, 175, 55)),
            ));
        }
        spans.push(Span::styled(
            format!("  {}", view.posted_age),
            Style::default().fg(Color::Rgb(140, 150, 165)),
        ));
        let header = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Left)
            .block(panel_block("Now Playing"));
        frame.render_widget(header, chunks[1]);
    }

    let prev_mark = if view.has_prev_group { "‹ prev group" } else { "  start" };
    let next_mark = if view.has_next_group { "next group ›" } else { "end  " };
    let paused_line = if view.paused { "\n\n⏸ PAUSED" } else { "" };
    let media_text = format!(
        "{}\n\nstory {}/{}\n\n{}{paused_line}\n\n{prev_mark}    |    {next_mark}",
        view.story.media_kind.label(),
        view.story_index + 1,
        view.story_count,
        truncate(&view.story.media_url, 60),
    );
    let media = Paragraph::new(media_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .alignment(Alignment::Center)
        .block(panel_block("Media"));
    frame.render_widget(media, chunks[2]);

    let contact = view
        .author
        .and_then(|author| author.contact_link.as_deref())
        .map(|link| format!("respond: {link}   "))
        .unwrap_or_default();
    let controls = Paragraph::new(format!(
        "{contact}←/→ story   space pause   swipe ←/→ group   swipe ↓ / Esc close"
    ))
    .style(Style::default().fg(Color::Rgb(185, 195, 210)))
    .alignment(Alignment::Center)
    .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[3]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[4]);
}

/// Instagram-style segmented bar: one segment per story, the active one
/// filled to the current progress fraction.
fn progress_line(view: &ViewFrame<'_>, width: u16) -> Line<'static> {
    let count = view.story_count.max(1);
    let usable = width.saturating_sub(count as u16) as usize;
    let seg_width = (usable / count).max(1);

    let mut spans = Vec::with_capacity(count * 2);
    for idx in 0..count {
        let filled = if idx < view.story_index {
            seg_width
        } else if idx == view.story_index {
            ((view.progress * seg_width as f64).round() as usize).min(seg_width)
        } else {
            0
        };
        spans.push(Span::styled(
            "█".repeat(filled),
            Style::default().fg(Color::White),
        ));
        spans.push(Span::styled(
            "░".repeat(seg_width - filled),
            Style::default().fg(Color::Rgb(90, 100, 115)),
        ));
        if idx + 1 < count {
            spans.push(Span::raw(" "));
        }
    }
    Line::from(spans)
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}
