use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Story {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) media_url: String,
    pub(crate) media_kind: MediaKind,
    pub(crate) duration_secs: f64,
    pub(crate) posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct StoryGroup {
    pub(crate) id: String,
    pub(crate) author_id: String,
    pub(crate) title: Option<String>,
    pub(crate) is_pinned: bool,
    /// Sorted oldest-first at parse time; playback order.
    pub(crate) stories: Vec<Story>,
}

impl StoryGroup {
    /// Newest story in the group. Groups are never empty past parsing.
    pub(crate) fn latest_story(&self) -> &Story {
        self.stories.last().expect("groups are non-empty by construction")
    }

    pub(crate) fn story_index_of(&self, story_id: &str) -> Option<usize> {
        self.stories.iter().position(|story| story.id == story_id)
    }

    pub(crate) fn durations(&self) -> Vec<f64> {
        self.stories.iter().map(|story| story.duration_secs).collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Author {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) slug: String,
    pub(crate) is_verified: bool,
    pub(crate) contact_link: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Catalog {
    authors: HashMap<String, Author>,
    groups: Vec<StoryGroup>,
}

impl Catalog {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| anyhow!("invalid feed JSON: {err}"))?;
        Ok(Self::from_value(&value))
    }

    pub(crate) fn from_value(value: &Value) -> Self {
        let mut authors = HashMap::new();
        if let Some(items) = value.get("authors").and_then(Value::as_array) {
            for item in items {
                if let Some(author) = parse_author(item) {
                    authors.insert(author.id.clone(), author);
                }
            }
        }

        let mut groups = Vec::new();
        if let Some(items) = value.get("story_groups").and_then(Value::as_array) {
            for item in items {
                if let Some(group) = parse_group(item) {
                    groups.push(group);
                }
            }
        }

        Self { authors, groups }
    }

    pub(crate) fn groups(&self) -> &[StoryGroup] {
        &self.groups
    }

    pub(crate) fn group(&self, group_id: &str) -> Option<&StoryGroup> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub(crate) fn author(&self, author_id: &str) -> Option<&Author> {
        self.authors.get(author_id)
    }

    pub(crate) fn author_for_group(&self, group: &StoryGroup) -> Option<&Author> {
        self.author(&group.author_id)
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    let text = value.get(key)?.as_str()?.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

fn parse_author(value: &Value) -> Option<Author> {
    let id = text_field(value, "id")?;
    let name = text_field(value, "name").unwrap_or_else(|| id.clone());
    let slug = text_field(value, "slug").unwrap_or_else(|| id.clone());
    Some(Author {
        id,
        name,
        slug,
        is_verified: value
            .get("is_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        contact_link: text_field(value, "contact_link"),
    })
}

fn parse_group(value: &Value) -> Option<StoryGroup> {
    let id = text_field(value, "id")?;
    let author_id = text_field(value, "author_id")?;

    let mut stories = Vec::new();
    if let Some(items) = value.get("stories").and_then(Value::as_array) {
        for item in items {
            if let Some(story) = parse_story(item, &id) {
                stories.push(story);
            }
        }
    }
    // Empty groups are never navigable; drop them here so downstream code
    // can rely on every group having at least one story.
    if stories.is_empty() {
        return None;
    }
    stories.sort_by_key(|story| story.posted_at);

    Some(StoryGroup {
        author_id,
        title: text_field(value, "title"),
        is_pinned: value
            .get("is_pinned")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        stories,
        id,
    })
}

fn parse_story(value: &Value, group_id: &str) -> Option<Story> {
    let id = text_field(value, "id")?;
    // A story without resolvable media cannot be rendered; skip it.
    let media_url = text_field(value, "media_url")?;
    let media_kind = match value.get("media_type").and_then(Value::as_str) {
        Some("video") => MediaKind::Video,
        _ => MediaKind::Image,
    };
    let duration_secs = match value.get("duration").and_then(Value::as_f64) {
        Some(duration) if duration > 0.0 => duration,
        _ => 5.0,
    };
    let posted_at = text_field(value, "posted_at")
        .or_else(|| text_field(value, "created_at"))
        .and_then(|raw| parse_timestamp(&raw))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Some(Story {
        id,
        group_id: group_id.to_string(),
        media_url,
        media_kind,
        duration_secs,
        posted_at,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Post-age display: relative for recent groups, absolute for pinned ones.
pub(crate) fn format_posted_display(
    posted_at: DateTime<Utc>,
    is_pinned: bool,
    now: DateTime<Utc>,
) -> String {
    if is_pinned {
        return posted_at.format("%b %-d").to_string();
    }

    let elapsed = now.signed_duration_since(posted_at);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h");
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{days}d");
    }
    posted_at.format("%b %-d").to_string()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn feed_json() -> &'static str {
        r#"{
            "authors": [
                { "id": "a-1", "name": "Avery", "slug": "avery", "is_verified": true,
                  "contact_link": "https://example.test/avery" }
            ],
            "story_groups": [
                { "id": "g-empty", "author_id": "a-1", "stories": [] },
                { "id": "g-1", "author_id": "a-1", "is_pinned": false, "stories": [
                    { "id": "s-new", "media_url": "u/new.jpg",
                      "posted_at": "2026-08-02T10:00:00Z" },
                    { "id": "s-old", "media_url": "u/old.mp4", "media_type": "video",
                      "duration": 7, "posted_at": "2026-08-01T10:00:00Z" },
                    { "id": "s-broken", "media_url": "  " }
                ] }
            ]
        }"#
    }

    #[test]
    fn parse_drops_empty_groups_and_unrenderable_stories() {
        let catalog = Catalog::parse(feed_json()).expect("feed parses");
        assert_eq!(catalog.groups().len(), 1);

        let group = catalog.group("g-1").expect("g-1 survives");
        assert_eq!(group.stories.len(), 2, "media-less story is dropped");
        assert!(catalog.group("g-empty").is_none());
    }

    #[test]
    fn parse_sorts_stories_oldest_first_regardless_of_feed_order() {
        let catalog = Catalog::parse(feed_json()).expect("feed parses");
        let group = catalog.group("g-1").expect("g-1 present");

        assert_eq!(group.stories[0].id, "s-old");
        assert_eq!(group.stories[1].id, "s-new");
        assert_eq!(group.latest_story().id, "s-new");
    }

    #[test]
    fn parse_defaults_media_kind_and_duration() {
        let catalog = Catalog::parse(feed_json()).expect("feed parses");
        let group = catalog.group("g-1").expect("g-1 present");

        let old = &group.stories[0];
        assert_eq!(old.media_kind, MediaKind::Video);
        assert_eq!(old.duration_secs, 7.0);

        let new = &group.stories[1];
        assert_eq!(new.media_kind, MediaKind::Image);
        assert_eq!(new.duration_secs, 5.0, "missing duration falls back to 5s");
    }

    #[test]
    fn format_posted_display_scales_with_age() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let cases = [
            (now - chrono::Duration::seconds(20), "now"),
            (now - chrono::Duration::minutes(5), "5m"),
            (now - chrono::Duration::hours(3), "3h"),
            (now - chrono::Duration::days(2), "2d"),
        ];
        for (posted, expected) in cases {
            assert_eq!(format_posted_display(posted, false, now), expected);
        }

        let old = now - chrono::Duration::days(30);
        assert_eq!(format_posted_display(old, false, now), "Jul 26");
    }

    #[test]
    fn format_posted_display_is_absolute_for_pinned_groups() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let recent = now - chrono::Duration::minutes(5);
        assert_eq!(format_posted_display(recent, true, now), "Aug 25");
    }
}
