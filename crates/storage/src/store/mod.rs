#![forbid(unsafe_code)]

mod bookmarks;
mod error;
mod export;
mod search;
mod taggings;
mod tags;
mod tree;
mod users;

pub use bookmarks::{BookmarkData, NewBookmark, TaggedBookmark};
pub use error::StoreError;
pub use export::{ExportBookmark, ExportDoc, ExportTag, ImportStats};
pub use search::{TagHit, MAX_PATTERN_RESULTS};
pub use taggings::{TaggableType, TaggingMode};
pub use tags::{NewTag, TagData};
pub use tree::{TagTree, TagTreeNode, TreeCache};
pub use users::{NewUser, UserData};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    tree_cache: TreeCache,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join("tagmarks.db");
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        install_schema(&conn)?;

        Ok(Self {
            conn,
            storage_dir,
            tree_cache: TreeCache::new(),
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;

         CREATE TABLE IF NOT EXISTS users (
             id INTEGER PRIMARY KEY,
             username TEXT NOT NULL UNIQUE,
             password TEXT NOT NULL,
             email TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS tags (
             id INTEGER PRIMARY KEY,
             owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             parent_id INTEGER REFERENCES tags(id) ON DELETE CASCADE,
             descr TEXT NOT NULL DEFAULT ''
         );
         CREATE INDEX IF NOT EXISTS idx_tags_owner ON tags(owner_id);
         CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_id);
         CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_root
             ON tags(owner_id) WHERE parent_id IS NULL;

         CREATE TABLE IF NOT EXISTS tag_names (
             tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
             name TEXT NOT NULL,
             is_primary INTEGER NOT NULL DEFAULT 0,
             UNIQUE(tag_id, name)
         );
         CREATE INDEX IF NOT EXISTS idx_tag_names_tag ON tag_names(tag_id);

         CREATE TABLE IF NOT EXISTS taggables (
             id INTEGER PRIMARY KEY,
             owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             type TEXT NOT NULL,
             created_at_ms INTEGER NOT NULL,
             updated_at_ms INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_taggables_owner ON taggables(owner_id);

         CREATE TABLE IF NOT EXISTS bookmarks (
             id INTEGER PRIMARY KEY REFERENCES taggables(id) ON DELETE CASCADE,
             url TEXT NOT NULL,
             title TEXT NOT NULL DEFAULT '',
             comment TEXT NOT NULL DEFAULT ''
         );
         CREATE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks(url);

         CREATE TABLE IF NOT EXISTS taggings (
             taggable_id INTEGER NOT NULL REFERENCES taggables(id) ON DELETE CASCADE,
             tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
             UNIQUE(taggable_id, tag_id)
         );
         CREATE INDEX IF NOT EXISTS idx_taggings_tag ON taggings(tag_id);",
    )?;
    Ok(())
}

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
