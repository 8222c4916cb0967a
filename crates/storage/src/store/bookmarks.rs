#![forbid(unsafe_code)]

use rusqlite::{params, OptionalExtension, Transaction};
use tm_core::TagId;
use tracing::debug;

use super::taggings::{
    get_taggings_tx, taggable_owner_tx, tagged_taggable_ids_tx, TaggableType, TaggingMode,
};
use super::{now_ms, users, SqliteStore, StoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookmarkData {
    pub id: i64,
    pub owner_id: i64,
    pub url: String,
    pub title: String,
    pub comment: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Default)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub comment: String,
}

/// A bookmark together with the paths of its explicitly chosen tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedBookmark {
    pub bookmark: BookmarkData,
    pub tag_paths: Vec<String>,
}

impl SqliteStore {
    pub fn create_bookmark(
        &mut self,
        owner_id: i64,
        bookmark: &NewBookmark,
    ) -> Result<i64, StoreError> {
        if bookmark.url.is_empty() {
            return Err(StoreError::InvalidInput("bookmark url must not be empty"));
        }

        let tx = self.conn.transaction()?;
        let bookmark_id = create_bookmark_tx(&tx, owner_id, bookmark)?;
        tx.commit()?;
        debug!(owner_id, bookmark_id, "created bookmark");
        Ok(bookmark_id)
    }

    pub fn update_bookmark(
        &mut self,
        bookmark_id: i64,
        bookmark: &NewBookmark,
    ) -> Result<(), StoreError> {
        if bookmark.url.is_empty() {
            return Err(StoreError::InvalidInput("bookmark url must not be empty"));
        }

        let tx = self.conn.transaction()?;
        let owner_id = taggable_owner_tx(&tx, bookmark_id)?;
        if bookmark_ids_by_url_tx(&tx, owner_id, &bookmark.url)?
            .into_iter()
            .any(|id| id != bookmark_id)
        {
            return Err(StoreError::InvalidInput(
                "bookmark with this url already exists",
            ));
        }

        tx.execute(
            "UPDATE bookmarks SET url = ?1, title = ?2, comment = ?3 WHERE id = ?4",
            params![bookmark.url, bookmark.title, bookmark.comment, bookmark_id],
        )?;
        tx.execute(
            "UPDATE taggables SET updated_at_ms = ?1 WHERE id = ?2",
            params![now_ms(), bookmark_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Deletes a taggable; its bookmark payload and taggings cascade away.
    pub fn delete_taggable(&mut self, taggable_id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        taggable_owner_tx(&tx, taggable_id)?;
        tx.execute("DELETE FROM taggables WHERE id = ?1", params![taggable_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_bookmark(&self, bookmark_id: i64) -> Result<BookmarkData, StoreError> {
        self.conn
            .query_row(
                "SELECT b.id, t.owner_id, b.url, b.title, b.comment, \
                        t.created_at_ms, t.updated_at_ms \
                 FROM bookmarks b JOIN taggables t ON t.id = b.id \
                 WHERE b.id = ?1",
                params![bookmark_id],
                row_to_bookmark,
            )
            .optional()?
            .ok_or(StoreError::TaggableNotFound)
    }

    pub fn bookmarks_by_url(
        &mut self,
        owner_id: i64,
        url: &str,
    ) -> Result<Vec<BookmarkData>, StoreError> {
        let tx = self.conn.transaction()?;
        let ids = bookmark_ids_by_url_tx(&tx, owner_id, url)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(bookmark_tx(&tx, id)?);
        }
        tx.commit()?;
        Ok(out)
    }

    /// Bookmarks tagged with every tag in `tag_ids` (untagged ones when
    /// the slice is empty), each with the rendered paths of its leaf
    /// taggings.
    pub fn get_tagged_bookmarks(
        &mut self,
        owner_id: i64,
        tag_ids: &[TagId],
    ) -> Result<Vec<TaggedBookmark>, StoreError> {
        let tree = self.tag_tree(owner_id)?;

        let tx = self.conn.transaction()?;
        let ids = tagged_taggable_ids_tx(&tx, Some(owner_id), tag_ids, Some(TaggableType::Bookmark))?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let bookmark = bookmark_tx(&tx, id)?;
            let leafs = get_taggings_tx(&tx, id, TaggingMode::Leafs)?;
            let mut tag_paths = Vec::with_capacity(leafs.len());
            for tag_id in leafs {
                let path = tree.path_of(tag_id).ok_or_else(|| {
                    StoreError::Internal(format!("tagging references unknown tag {tag_id}"))
                })?;
                tag_paths.push(path);
            }
            out.push(TaggedBookmark { bookmark, tag_paths });
        }

        tx.commit()?;
        Ok(out)
    }
}

pub(crate) fn create_bookmark_tx(
    tx: &Transaction<'_>,
    owner_id: i64,
    bookmark: &NewBookmark,
) -> Result<i64, StoreError> {
    if !users::user_exists_tx(tx, owner_id)? {
        return Err(StoreError::UserNotFound);
    }
    if !bookmark_ids_by_url_tx(tx, owner_id, &bookmark.url)?.is_empty() {
        return Err(StoreError::InvalidInput(
            "bookmark with this url already exists",
        ));
    }

    let now = now_ms();
    tx.execute(
        "INSERT INTO taggables(owner_id, type, created_at_ms, updated_at_ms) \
         VALUES (?1, ?2, ?3, ?4)",
        params![owner_id, TaggableType::Bookmark.as_str(), now, now],
    )?;
    let bookmark_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO bookmarks(id, url, title, comment) VALUES (?1, ?2, ?3, ?4)",
        params![bookmark_id, bookmark.url, bookmark.title, bookmark.comment],
    )?;
    Ok(bookmark_id)
}

pub(crate) fn bookmark_tx(tx: &Transaction<'_>, bookmark_id: i64) -> Result<BookmarkData, StoreError> {
    tx.query_row(
        "SELECT b.id, t.owner_id, b.url, b.title, b.comment, \
                t.created_at_ms, t.updated_at_ms \
         FROM bookmarks b JOIN taggables t ON t.id = b.id \
         WHERE b.id = ?1",
        params![bookmark_id],
        row_to_bookmark,
    )
    .optional()?
    .ok_or(StoreError::TaggableNotFound)
}

pub(crate) fn bookmark_ids_by_url_tx(
    tx: &Transaction<'_>,
    owner_id: i64,
    url: &str,
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT b.id FROM bookmarks b JOIN taggables t ON t.id = b.id \
         WHERE t.owner_id = ?1 AND b.url = ?2 ORDER BY b.id",
    )?;
    let ids = stmt
        .query_map(params![owner_id, url], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn row_to_bookmark(row: &rusqlite::Row<'_>) -> Result<BookmarkData, rusqlite::Error> {
    Ok(BookmarkData {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        url: row.get(2)?,
        title: row.get(3)?,
        comment: row.get(4)?,
        created_at_ms: row.get(5)?,
        updated_at_ms: row.get(6)?,
    })
}
