use super::catalog::StoryGroup;
use super::viewed::ViewedMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChainKind {
    Unseen,
    Seen,
}

/// What happens when forward navigation runs off the end of the unseen chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ChainEndPolicy {
    /// End the session rather than surprising the viewer with old content.
    #[default]
    CloseSession,
    /// Fall through into the first group of the (frozen) seen chain.
    ContinueIntoSeen,
}

/// The two traversal sequences, each ordered by the group's newest story,
/// newest group first. Chains are never merged.
#[derive(Debug, Clone)]
pub(crate) struct Chains {
    pub(crate) unseen: Vec<String>,
    pub(crate) seen: Vec<String>,
}

impl Chains {
    pub(crate) fn chain_for(&self, group_id: &str) -> Option<ChainKind> {
        if self.unseen.iter().any(|id| id == group_id) {
            return Some(ChainKind::Unseen);
        }
        if self.seen.iter().any(|id| id == group_id) {
            return Some(ChainKind::Seen);
        }
        None
    }

    pub(crate) fn snapshot(&self, kind: ChainKind) -> ChainSnapshot {
        let group_ids = match kind {
            ChainKind::Unseen => self.unseen.clone(),
            ChainKind::Seen => self.seen.clone(),
        };
        ChainSnapshot { kind, group_ids }
    }

    /// Browser display order: the unseen chain first, then the seen chain.
    pub(crate) fn display_order(&self) -> impl Iterator<Item = &str> {
        self.unseen
            .iter()
            .chain(self.seen.iter())
            .map(String::as_str)
    }
}

/// Frozen traversal order for one viewing session. Seen status changing
/// mid-session must not reorder or drop entries, so this owns its ids.
#[derive(Debug, Clone)]
pub(crate) struct ChainSnapshot {
    kind: ChainKind,
    group_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Neighbors {
    pub(crate) prev: Option<String>,
    pub(crate) next: Option<String>,
}

impl ChainSnapshot {
    pub(crate) fn kind(&self) -> ChainKind {
        self.kind
    }

    pub(crate) fn first(&self) -> Option<&str> {
        self.group_ids.first().map(String::as_str)
    }

    /// Adjacent ids within this chain only; both `None` when the group is not
    /// part of the snapshot.
    pub(crate) fn neighbors(&self, group_id: &str) -> Neighbors {
        let Some(idx) = self.group_ids.iter().position(|id| id == group_id) else {
            return Neighbors::default();
        };
        Neighbors {
            prev: idx.checked_sub(1).map(|i| self.group_ids[i].clone()),
            next: self.group_ids.get(idx + 1).cloned(),
        }
    }
}

/// Partition the eligible groups by seen status and order each partition by
/// its newest story, newest first. Input groups are already non-empty.
pub(crate) fn build_chains(groups: &[StoryGroup], viewed: &ViewedMemory) -> Chains {
    let mut unseen: Vec<&StoryGroup> = Vec::new();
    let mut seen: Vec<&StoryGroup> = Vec::new();
    for group in groups {
        if viewed.is_unseen(&group.id, &group.latest_story().id) {
            unseen.push(group);
        } else {
            seen.push(group);
        }
    }

    let newest_first =
        |a: &&StoryGroup, b: &&StoryGroup| b.latest_story().posted_at.cmp(&a.latest_story().posted_at);
    unseen.sort_by(newest_first);
    seen.sort_by(newest_first);

    Chains {
        unseen: unseen.into_iter().map(|group| group.id.clone()).collect(),
        seen: seen.into_iter().map(|group| group.id.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::super::catalog::{MediaKind, Story, StoryGroup};
    use super::*;

    fn group(id: &str, story_id: &str, day: u32) -> StoryGroup {
        StoryGroup {
            id: id.to_string(),
            author_id: format!("author-{id}"),
            title: None,
            is_pinned: false,
            stories: vec![Story {
                id: story_id.to_string(),
                group_id: id.to_string(),
                media_url: format!("media/{story_id}.jpg"),
                media_kind: MediaKind::Image,
                duration_secs: 5.0,
                posted_at: Utc.with_ymd_and_hms(2026, 8, day, 0, 0, 0).unwrap(),
            }],
        }
    }

    #[test]
    fn partitions_by_seen_status_and_orders_newest_first() {
        let groups = vec![
            group("g-old", "s-old", 1),
            group("g-new", "s-new", 20),
            group("g-seen", "s-seen", 10),
        ];
        let mut viewed = ViewedMemory::ephemeral();
        viewed.record_view("g-seen", "s-seen");

        let chains = build_chains(&groups, &viewed);
        assert_eq!(chains.unseen, vec!["g-new", "g-old"]);
        assert_eq!(chains.seen, vec!["g-seen"]);
        assert_eq!(chains.chain_for("g-old"), Some(ChainKind::Unseen));
        assert_eq!(chains.chain_for("g-seen"), Some(ChainKind::Seen));
        assert_eq!(chains.chain_for("g-missing"), None);
    }

    #[test]
    fn stale_record_with_new_story_returns_group_to_unseen_chain() {
        let groups = vec![group("g-1", "s-2", 5)];
        let mut viewed = ViewedMemory::ephemeral();
        viewed.record_view("g-1", "s-1");

        let chains = build_chains(&groups, &viewed);
        assert_eq!(chains.unseen, vec!["g-1"]);
        assert!(chains.seen.is_empty());
    }

    #[test]
    fn snapshot_neighbors_stay_inside_one_chain() {
        let groups = vec![
            group("g-a", "s-a", 3),
            group("g-b", "s-b", 2),
            group("g-c", "s-c", 1),
        ];
        let viewed = ViewedMemory::ephemeral();
        let chains = build_chains(&groups, &viewed);
        let snapshot = chains.snapshot(ChainKind::Unseen);

        let mid = snapshot.neighbors("g-b");
        assert_eq!(mid.prev.as_deref(), Some("g-a"));
        assert_eq!(mid.next.as_deref(), Some("g-c"));

        let head = snapshot.neighbors("g-a");
        assert_eq!(head.prev, None);
        let tail = snapshot.neighbors("g-c");
        assert_eq!(tail.next, None);

        assert_eq!(snapshot.neighbors("g-elsewhere"), Neighbors::default());
    }

    #[test]
    fn snapshot_is_stable_when_seen_status_changes_mid_session() {
        let groups = vec![group("g-a", "s-a", 3), group("g-b", "s-b", 2)];
        let mut viewed = ViewedMemory::ephemeral();

        let snapshot = build_chains(&groups, &viewed).snapshot(ChainKind::Unseen);
        let before = snapshot.neighbors("g-a");

        // Simulate the in-session record that would move g-b to the seen
        // chain on the next build; the frozen snapshot must not care.
        viewed.record_view("g-b", "s-b");
        let after = snapshot.neighbors("g-a");

        assert_eq!(before, after);
        assert_eq!(after.next.as_deref(), Some("g-b"));
    }
}
