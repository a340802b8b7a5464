use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::db::Database;

use super::catalog::StoryGroup;

/// Persistence commands handed to the background writer. Playback never waits
/// on these; a dropped or failed write only costs "seen" memory.
enum WriteCmd {
    RecordView { group_id: String, story_id: String },
    SetLocation { group_id: String, story_index: usize },
    ClearLocation,
}

/// Device-local memory of the last story seen per group, plus the published
/// viewer location. Reads come from an in-memory snapshot loaded once at
/// startup; writes are fire-and-forget.
pub(crate) struct ViewedMemory {
    records: HashMap<String, String>,
    writer: Option<mpsc::Sender<WriteCmd>>,
}

impl ViewedMemory {
    /// Load the snapshot from the database. Fails open: when the store cannot
    /// be read every group is treated as unseen and a warning is returned for
    /// the caller to surface.
    pub(crate) fn load(db_path: &Path) -> (Self, Option<String>) {
        let records = match Database::open(db_path)
            .and_then(|db| db.migrate().map(|_| db))
            .and_then(|db| db.viewed_map())
        {
            Ok(records) => records,
            Err(err) => {
                let warning = format!("viewed memory unavailable, treating all as unseen: {err}");
                return (
                    Self {
                        records: HashMap::new(),
                        writer: spawn_writer(db_path.to_path_buf()),
                    },
                    Some(warning),
                );
            }
        };

        (
            Self {
                records,
                writer: spawn_writer(db_path.to_path_buf()),
            },
            None,
        )
    }

    /// Snapshot-only store with no persistence; used by tests and as the
    /// fallback when no database path can be resolved.
    pub(crate) fn ephemeral() -> Self {
        Self {
            records: HashMap::new(),
            writer: None,
        }
    }

    /// Idempotent upsert: overwritten on every open of the group, not only on
    /// completion.
    pub(crate) fn record_view(&mut self, group_id: &str, latest_story_id: &str) {
        self.records
            .insert(group_id.to_string(), latest_story_id.to_string());
        self.send(WriteCmd::RecordView {
            group_id: group_id.to_string(),
            story_id: latest_story_id.to_string(),
        });
    }

    /// True when the group has never been opened or new content has arrived
    /// since the last view.
    pub(crate) fn is_unseen(&self, group_id: &str, latest_story_id: &str) -> bool {
        match self.records.get(group_id) {
            Some(stored) => stored != latest_story_id,
            None => true,
        }
    }

    /// Starting index for a group: the story after the last-seen one, or 0
    /// when nothing is stored, the stored story is gone, or everything has
    /// been seen.
    pub(crate) fn first_unseen_index(&self, group: &StoryGroup) -> usize {
        let Some(stored) = self.records.get(&group.id) else {
            return 0;
        };
        match group.story_index_of(stored) {
            Some(idx) if idx + 1 < group.stories.len() => idx + 1,
            _ => 0,
        }
    }

    pub(crate) fn publish_location(&self, group_id: &str, story_index: usize) {
        self.send(WriteCmd::SetLocation {
            group_id: group_id.to_string(),
            story_index,
        });
    }

    pub(crate) fn clear_location(&self) {
        self.send(WriteCmd::ClearLocation);
    }

    fn send(&self, cmd: WriteCmd) {
        if let Some(writer) = &self.writer {
            // A disconnected writer means persistence already failed; the
            // in-memory snapshot stays authoritative for this session.
            let _ = writer.send(cmd);
        }
    }
}

fn spawn_writer(db_path: PathBuf) -> Option<mpsc::Sender<WriteCmd>> {
    let (tx, rx) = mpsc::channel::<WriteCmd>();
    std::thread::spawn(move || {
        let db = match Database::open(&db_path).and_then(|db| db.migrate().map(|_| db)) {
            Ok(db) => db,
            Err(err) => {
                eprintln!("Warning: viewed memory writes disabled: {err}");
                return;
            }
        };

        while let Ok(cmd) = rx.recv() {
            let result = match cmd {
                WriteCmd::RecordView { group_id, story_id } => {
                    db.upsert_viewed(&group_id, &story_id)
                }
                WriteCmd::SetLocation {
                    group_id,
                    story_index,
                } => db.set_location(&group_id, story_index),
                WriteCmd::ClearLocation => db.clear_location(),
            };
            if let Err(err) = result {
                eprintln!("Warning: viewed memory write failed: {err}");
            }
        }
    });
    Some(tx)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::super::catalog::{MediaKind, Story, StoryGroup};
    use super::*;

    fn group_with_stories(ids: &[&str]) -> StoryGroup {
        let stories = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| Story {
                id: id.to_string(),
                group_id: "g-1".to_string(),
                media_url: format!("media/{id}.jpg"),
                media_kind: MediaKind::Image,
                duration_secs: 5.0,
                posted_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, idx as u32, 0).unwrap(),
            })
            .collect();
        StoryGroup {
            id: "g-1".to_string(),
            author_id: "a-1".to_string(),
            title: None,
            is_pinned: false,
            stories,
        }
    }

    #[test]
    fn unknown_group_is_unseen_and_starts_at_zero() {
        let viewed = ViewedMemory::ephemeral();
        let group = group_with_stories(&["s-1", "s-2"]);

        assert!(viewed.is_unseen("g-1", "s-2"));
        assert_eq!(viewed.first_unseen_index(&group), 0);
    }

    #[test]
    fn record_view_marks_current_content_seen_until_new_story_arrives() {
        let mut viewed = ViewedMemory::ephemeral();
        viewed.record_view("g-1", "s-2");

        assert!(!viewed.is_unseen("g-1", "s-2"));
        assert!(viewed.is_unseen("g-1", "s-3"), "new latest id flips back to unseen");
    }

    #[test]
    fn first_unseen_index_resumes_after_last_seen_story() {
        let mut viewed = ViewedMemory::ephemeral();
        let group = group_with_stories(&["s-1", "s-2", "s-3"]);

        viewed.record_view("g-1", "s-1");
        assert_eq!(viewed.first_unseen_index(&group), 1);

        viewed.record_view("g-1", "s-3");
        assert_eq!(viewed.first_unseen_index(&group), 0, "fully seen restarts at 0");

        viewed.record_view("g-1", "s-gone");
        assert_eq!(viewed.first_unseen_index(&group), 0, "stale story id restarts at 0");
    }
}
