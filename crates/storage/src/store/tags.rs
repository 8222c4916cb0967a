#![forbid(unsafe_code)]

use rusqlite::{params, OptionalExtension, Transaction};
use tm_core::hier::ParentSource;
use tm_core::TagId;
use tracing::debug;

use super::taggings::{self, TaggingMode};
use super::{users, SqliteStore, StoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagData {
    pub id: TagId,
    pub owner_id: i64,
    pub parent_id: Option<TagId>,
    pub description: String,
    /// All names of the tag, primary first.
    pub names: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewTag {
    /// First name is the primary one. Must be non-empty for any tag but
    /// the root.
    pub names: Vec<String>,
    pub description: String,
    pub subtags: Vec<NewTag>,
}

impl SqliteStore {
    /// Creates a tag (and, recursively, its subtags) under `parent_id`.
    /// Returns the id of the topmost created tag.
    pub fn create_tag(
        &mut self,
        owner_id: i64,
        parent_id: TagId,
        tag: &NewTag,
    ) -> Result<TagId, StoreError> {
        let tx = self.conn.transaction()?;
        let tag_id = create_tag_batch_tx(&tx, owner_id, Some(parent_id), tag)?;
        tx.commit()?;
        self.tree_cache.invalidate(owner_id);
        debug!(owner_id, tag_id, parent_id, "created tag");
        Ok(tag_id)
    }

    pub fn get_tag(&self, tag_id: TagId) -> Result<TagData, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT owner_id, parent_id, descr FROM tags WHERE id = ?1",
                params![tag_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<TagId>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::TagNotFound)?;

        let mut stmt = self.conn.prepare(
            "SELECT name FROM tag_names WHERE tag_id = ?1 ORDER BY is_primary DESC, name",
        )?;
        let names = stmt
            .query_map(params![tag_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(TagData {
            id: tag_id,
            owner_id: row.0,
            parent_id: row.1,
            description: row.2,
            names,
        })
    }

    /// All names of a tag, primary first.
    pub fn tag_names(&self, tag_id: TagId) -> Result<Vec<String>, StoreError> {
        Ok(self.get_tag(tag_id)?.names)
    }

    /// Looks up a direct child of `parent_id` by any of its names.
    pub fn tag_id_by_name(
        &mut self,
        parent_id: TagId,
        name: &str,
    ) -> Result<Option<TagId>, StoreError> {
        let tx = self.conn.transaction()?;
        let id = tag_id_by_name_tx(&tx, parent_id, name)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn root_tag_id(&mut self, owner_id: i64) -> Result<TagId, StoreError> {
        let tx = self.conn.transaction()?;
        let id = root_tag_id_tx(&tx, owner_id)?;
        tx.commit()?;
        Ok(id)
    }

    /// Resolves a "/"-separated path of tag names to a tag id, starting at
    /// the owner's root. Empty segments are skipped, so "/a//b" and "a/b"
    /// resolve the same tag. Matching is done against every alias.
    pub fn tag_id_by_path(&mut self, owner_id: i64, path: &str) -> Result<TagId, StoreError> {
        let tx = self.conn.transaction()?;
        let id = tag_id_by_path_tx(&tx, owner_id, path)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn update_tag_description(
        &mut self,
        tag_id: TagId,
        description: &str,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let (owner_id, _) = tag_row_tx(&tx, tag_id)?;
        tx.execute(
            "UPDATE tags SET descr = ?1 WHERE id = ?2",
            params![description, tag_id],
        )?;
        tx.commit()?;
        self.tree_cache.invalidate(owner_id);
        Ok(())
    }

    /// Deletes a tag and, via cascade, its whole subtree along with any
    /// taggings pointing into it. Refuses to delete the root tag.
    ///
    /// When the deleted tag sat directly under the root, taggables left
    /// tagged with nothing but the root are fully untagged, so they show
    /// up in untagged queries again.
    pub fn delete_tag(&mut self, tag_id: TagId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let (owner_id, parent_id) = tag_row_tx(&tx, tag_id)?;
        let Some(parent_id) = parent_id else {
            return Err(StoreError::InvalidInput("refusing to delete the root tag"));
        };

        tx.execute("DELETE FROM tags WHERE id = ?1", params![tag_id])?;

        let root_id = root_tag_id_tx(&tx, owner_id)?;
        if parent_id == root_id {
            let mut stmt = tx.prepare(
                "SELECT taggable_id FROM taggings \
                 GROUP BY taggable_id HAVING COUNT(*) = 1 AND MAX(tag_id) = ?1",
            )?;
            let orphaned = stmt
                .query_map(params![root_id], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            drop(stmt);
            for taggable_id in orphaned {
                taggings::set_taggings_tx(&tx, taggable_id, &[], TaggingMode::All)?;
            }
        }

        tx.commit()?;
        self.tree_cache.invalidate(owner_id);
        debug!(owner_id, tag_id, "deleted tag");
        Ok(())
    }

    /// Resolves a path like "a/b/c", creating any missing tags along the
    /// way, and returns the id of the final component. Segments are used
    /// verbatim; an invalid segment is an error, not cleaned up.
    pub fn ensure_tag_path(&mut self, owner_id: i64, path: &str) -> Result<TagId, StoreError> {
        let tx = self.conn.transaction()?;
        let tag_id = ensure_tag_path_tx(&tx, owner_id, path)?;
        tx.commit()?;
        self.tree_cache.invalidate(owner_id);
        Ok(tag_id)
    }
}

pub(crate) fn create_tag_batch_tx(
    tx: &Transaction<'_>,
    owner_id: i64,
    parent_id: Option<TagId>,
    tag: &NewTag,
) -> Result<TagId, StoreError> {
    if tag.names.is_empty() {
        return Err(StoreError::InvalidInput("tag must have at least one name"));
    }

    if let Some(parent_id) = parent_id {
        let (parent_owner, _) = tag_row_tx(tx, parent_id)?;
        if parent_owner != owner_id {
            return Err(StoreError::InvalidInput(
                "parent tag belongs to another user",
            ));
        }
    } else if !users::user_exists_tx(tx, owner_id)? {
        return Err(StoreError::UserNotFound);
    }

    tx.execute(
        "INSERT INTO tags(owner_id, parent_id, descr) VALUES (?1, ?2, ?3)",
        params![owner_id, parent_id, tag.description],
    )?;
    let tag_id = tx.last_insert_rowid();

    for (idx, name) in tag.names.iter().enumerate() {
        add_tag_name_tx(tx, tag_id, parent_id, name, idx == 0)?;
    }

    for subtag in &tag.subtags {
        create_tag_batch_tx(tx, owner_id, Some(tag_id), subtag)?;
    }

    Ok(tag_id)
}

pub(crate) fn add_tag_name_tx(
    tx: &Transaction<'_>,
    tag_id: TagId,
    parent_id: Option<TagId>,
    name: &str,
    is_primary: bool,
) -> Result<(), StoreError> {
    validate_tag_name(name, parent_id.is_none())?;

    if let Some(parent_id) = parent_id {
        if tag_id_by_name_tx(tx, parent_id, name)?.is_some() {
            return Err(StoreError::InvalidInput(
                "tag with this name already exists under the parent",
            ));
        }
    }

    tx.execute(
        "INSERT INTO tag_names(tag_id, name, is_primary) VALUES (?1, ?2, ?3)",
        params![tag_id, name, is_primary],
    )?;
    Ok(())
}

/// Checks a single tag name. Only the root tag may have an empty name;
/// everything else must be non-empty and free of separators, pipes,
/// whitespace and control characters.
pub(crate) fn validate_tag_name(name: &str, allow_empty: bool) -> Result<(), StoreError> {
    if name.is_empty() {
        if allow_empty {
            return Ok(());
        }
        return Err(StoreError::InvalidInput("tag name must not be empty"));
    }
    for ch in name.chars() {
        if ch == '/' || ch == '|' || ch.is_whitespace() || ch.is_control() {
            return Err(StoreError::InvalidInput(
                "tag name contains a forbidden character",
            ));
        }
    }
    Ok(())
}

/// Best-effort normalization of arbitrary text into a valid tag name:
/// whitespace runs become a single "-", forbidden characters are dropped.
/// May return an empty string if nothing survives.
pub(crate) fn cleanup_tag_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_dash = !out.is_empty();
            continue;
        }
        if ch == '/' || ch == '|' || ch.is_control() {
            continue;
        }
        if pending_dash {
            out.push('-');
            pending_dash = false;
        }
        out.push(ch);
    }
    out
}

pub(crate) fn tag_row_tx(
    tx: &Transaction<'_>,
    tag_id: TagId,
) -> Result<(i64, Option<TagId>), StoreError> {
    tx.query_row(
        "SELECT owner_id, parent_id FROM tags WHERE id = ?1",
        params![tag_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or(StoreError::TagNotFound)
}

pub(crate) fn root_tag_id_tx(tx: &Transaction<'_>, owner_id: i64) -> Result<TagId, StoreError> {
    tx.query_row(
        "SELECT id FROM tags WHERE owner_id = ?1 AND parent_id IS NULL",
        params![owner_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(StoreError::TagNotFound)
}

pub(crate) fn tag_id_by_name_tx(
    tx: &Transaction<'_>,
    parent_id: TagId,
    name: &str,
) -> Result<Option<TagId>, StoreError> {
    let id = tx
        .query_row(
            "SELECT t.id FROM tags t JOIN tag_names n ON n.tag_id = t.id \
             WHERE t.parent_id = ?1 AND n.name = ?2",
            params![parent_id, name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub(crate) fn tag_id_by_path_tx(
    tx: &Transaction<'_>,
    owner_id: i64,
    path: &str,
) -> Result<TagId, StoreError> {
    let mut cur = root_tag_id_tx(tx, owner_id)?;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        cur = tag_id_by_name_tx(tx, cur, segment)?.ok_or(StoreError::TagNotFound)?;
    }
    Ok(cur)
}

pub(crate) fn ensure_tag_path_tx(
    tx: &Transaction<'_>,
    owner_id: i64,
    path: &str,
) -> Result<TagId, StoreError> {
    let mut cur = root_tag_id_tx(tx, owner_id)?;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        validate_tag_name(segment, false)?;
        cur = match tag_id_by_name_tx(tx, cur, segment)? {
            Some(id) => id,
            None => {
                let new_tag = NewTag {
                    names: vec![segment.to_owned()],
                    description: String::new(),
                    subtags: Vec::new(),
                };
                create_tag_batch_tx(tx, owner_id, Some(cur), &new_tag)?
            }
        };
    }
    Ok(cur)
}

/// Parent lookup backed by the tags table, used to resolve tagging
/// closures inside a transaction.
pub(crate) struct TxParentSource<'a, 'tx> {
    pub tx: &'a Transaction<'tx>,
}

impl ParentSource for TxParentSource<'_, '_> {
    type Error = StoreError;

    fn parent_of(&mut self, id: TagId) -> Result<Option<TagId>, Self::Error> {
        let (_, parent_id) = tag_row_tx(self.tx, id)?;
        Ok(parent_id)
    }
}
