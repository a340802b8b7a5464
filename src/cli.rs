use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "storytrack",
    version,
    about = "Browse and play story feeds with seen-progress tracking"
)]
pub struct Cli {
    /// Feed source: path to a feed JSON file or an http(s) URL.
    /// Falls back to $STORYTRACK_FEED, then the platform data dir.
    #[arg(long, global = true)]
    pub feed: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the viewer directly at a story group (deep link).
    Open {
        group_id: String,
        /// Starting story index inside the group; re-validated on open.
        #[arg(long)]
        story: Option<usize>,
        /// Fall through into the seen chain when the unseen chain runs out.
        #[arg(long)]
        continue_into_seen: bool,
    },
    /// Print the eligible story groups in traversal order.
    List,
    /// Print the persisted viewed records.
    History,
    /// Clear all viewed records and the stored location.
    Forget,
    /// Run the interactive viewer (default).
    Tui {
        /// Fall through into the seen chain when the unseen chain runs out.
        #[arg(long)]
        continue_into_seen: bool,
    },
}
