use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone)]
pub struct ViewedEntry {
    pub group_id: String,
    pub last_story_id: String,
    pub last_seen_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLocation {
    pub group_id: String,
    pub story_index: usize,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS viewed_progress (
                group_id TEXT PRIMARY KEY,
                last_story_id TEXT NOT NULL,
                last_seen_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_viewed_progress_seen_at ON viewed_progress(last_seen_at DESC);
            CREATE TABLE IF NOT EXISTS viewer_location (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                group_id TEXT NOT NULL,
                story_index INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn upsert_viewed(&self, group_id: &str, last_story_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO viewed_progress (group_id, last_story_id, last_seen_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(group_id) DO UPDATE SET
                last_story_id = excluded.last_story_id,
                last_seen_at = excluded.last_seen_at
            "#,
            params![group_id, last_story_id, now],
        )?;
        Ok(())
    }

    pub fn viewed_map(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT group_id, last_story_id FROM viewed_progress")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut out = HashMap::new();
        for row in rows {
            let (group_id, last_story_id): (String, String) = row?;
            out.insert(group_id, last_story_id);
        }
        Ok(out)
    }

    pub fn list_viewed(&self) -> Result<Vec<ViewedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id, last_story_id, last_seen_at FROM viewed_progress ORDER BY last_seen_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ViewedEntry {
                group_id: row.get(0)?,
                last_story_id: row.get(1)?,
                last_seen_at: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn clear_viewed(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM viewed_progress", [])?;
        self.conn.execute("DELETE FROM viewer_location", [])?;
        Ok(removed)
    }

    pub fn set_location(&self, group_id: &str, story_index: usize) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO viewer_location (slot, group_id, story_index, updated_at)
            VALUES (0, ?1, ?2, ?3)
            ON CONFLICT(slot) DO UPDATE SET
                group_id = excluded.group_id,
                story_index = excluded.story_index,
                updated_at = excluded.updated_at
            "#,
            params![group_id, story_index as i64, now],
        )?;
        Ok(())
    }

    pub fn clear_location(&self) -> Result<()> {
        self.conn.execute("DELETE FROM viewer_location", [])?;
        Ok(())
    }

    pub fn location(&self) -> Result<Option<StoredLocation>> {
        let row = self
            .conn
            .query_row(
                "SELECT group_id, story_index FROM viewer_location WHERE slot = 0",
                [],
                |row| {
                    let group_id: String = row.get(0)?;
                    let story_index: i64 = row.get(1)?;
                    Ok(StoredLocation {
                        group_id,
                        story_index: story_index.max(0) as usize,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
