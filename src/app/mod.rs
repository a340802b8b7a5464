mod catalog;
mod chain;
mod gesture;
mod playback;
mod session;
mod tui;
mod viewed;


use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};

use crate::cli::{Cli, Command};
use crate::db::Database;
use crate::http;
use crate::paths::{database_file_path, default_feed_path};

use self::catalog::{Catalog, format_posted_display, truncate};
use self::chain::{ChainEndPolicy, build_chains};
use self::tui::DeepLink;
use self::viewed::ViewedMemory;

const FEED_FETCH_ATTEMPTS: usize = 3;
const FEED_RETRY_DELAY: Duration = Duration::from_millis(500);

pub fn run(cli: Cli) -> Result<()> {
    let feed_source = resolve_feed_source(cli.feed, env::var("STORYTRACK_FEED").ok())?;

    match cli.command {
        Some(Command::List) => run_list(&feed_source),
        Some(Command::History) => run_history(),
        Some(Command::Forget) => run_forget(),
        Some(Command::Open {
            group_id,
            story,
            continue_into_seen,
        }) => {
            tui::run_tui(
                &feed_source,
                chain_policy(continue_into_seen),
                Some(DeepLink {
                    group_id: group_id.clone(),
                    story_index: story,
                }),
            )?;
            match story {
                Some(idx) => println!("Share: storytrack open {group_id} --story {idx}"),
                None => println!("Share: storytrack open {group_id}"),
            }
            Ok(())
        }
        Some(Command::Tui { continue_into_seen }) => {
            tui::run_tui(&feed_source, chain_policy(continue_into_seen), None)
        }
        None => tui::run_tui(&feed_source, ChainEndPolicy::default(), None),
    }
}

fn chain_policy(continue_into_seen: bool) -> ChainEndPolicy {
    if continue_into_seen {
        ChainEndPolicy::ContinueIntoSeen
    } else {
        ChainEndPolicy::CloseSession
    }
}

pub(crate) fn resolve_feed_source(
    flag: Option<String>,
    env_value: Option<String>,
) -> Result<String> {
    if let Some(flag) = flag
        && !flag.trim().is_empty()
    {
        return Ok(flag);
    }
    if let Some(env_value) = env_value
        && !env_value.trim().is_empty()
    {
        return Ok(env_value);
    }
    Ok(default_feed_path()?.display().to_string())
}

pub(crate) fn load_catalog(source: &str) -> Result<Catalog> {
    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        http::fetch_text(source, FEED_FETCH_ATTEMPTS, FEED_RETRY_DELAY)
            .map_err(|err| anyhow::anyhow!(err))?
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read feed file {source}"))?
    };
    Catalog::parse(&raw)
}

fn run_list(feed_source: &str) -> Result<()> {
    let catalog = load_catalog(feed_source)?;
    if catalog.groups().is_empty() {
        println!("Feed has no playable story groups.");
        return Ok(());
    }

    let (viewed, warning) = load_viewed_memory()?;
    if let Some(warning) = warning {
        eprintln!("Warning: {warning}");
    }
    let chains = build_chains(catalog.groups(), &viewed);
    let now = Utc::now();

    println!(
        "{:<3} {:<22} {:<24} {:<8} {:<8}",
        "", "GROUP", "AUTHOR", "STORIES", "POSTED"
    );
    for group_id in chains.display_order() {
        let Some(group) = catalog.group(group_id) else {
            continue;
        };
        let marker = if viewed.is_unseen(&group.id, &group.latest_story().id) {
            "●"
        } else {
            " "
        };
        let author = catalog
            .author_for_group(group)
            .map(|author| author.name.as_str())
            .unwrap_or("-");
        println!(
            "{marker:<3} {:<22} {:<24} {:<8} {:<8}",
            truncate(&group.id, 22),
            truncate(author, 24),
            group.stories.len(),
            format_posted_display(group.latest_story().posted_at, group.is_pinned, now),
        );
    }
    Ok(())
}

fn run_history() -> Result<()> {
    let db = open_db()?;
    let items = db.list_viewed()?;
    if items.is_empty() {
        println!("No viewed records yet. Open a story group first.");
        return Ok(());
    }

    println!(
        "{:<24} {:<24} {:<28}",
        "GROUP", "LAST STORY", "LAST SEEN"
    );
    for item in items {
        println!(
            "{:<24} {:<24} {:<28}",
            truncate(&item.group_id, 24),
            truncate(&item.last_story_id, 24),
            format_seen_display(&item.last_seen_at),
        );
    }
    Ok(())
}

fn run_forget() -> Result<()> {
    let db = open_db()?;
    let removed = db.clear_viewed()?;
    println!("Cleared {removed} viewed record(s).");
    Ok(())
}

pub(crate) fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}

pub(crate) fn load_viewed_memory() -> Result<(ViewedMemory, Option<String>)> {
    let db_path = database_file_path()?;
    Ok(ViewedMemory::load(&db_path))
}

fn format_seen_display(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M %:z")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}
