#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tm_core::TagId;
use tracing::info;

use super::bookmarks::{bookmark_tx, bookmark_ids_by_url_tx, create_bookmark_tx, NewBookmark};
use super::taggings::{get_taggings_tx, set_taggings_tx, TaggingMode};
use super::tags::{
    create_tag_batch_tx, ensure_tag_path_tx, root_tag_id_tx, tag_id_by_name_tx, NewTag,
};
use super::tree::TagTree;
use super::{SqliteStore, StoreError};

/// Portable snapshot of one user's tags and bookmarks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportDoc {
    /// The root of the tag tree. Its own names are not meaningful; only
    /// its subtags are.
    pub tags: ExportTag,
    pub bookmarks: Vec<ExportBookmark>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportTag {
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtags: Vec<ExportTag>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportBookmark {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Leaf tag paths like "a/b/c".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub tags_created: usize,
    pub bookmarks_created: usize,
}

impl SqliteStore {
    /// Serializes a user's whole tag tree and bookmark collection to
    /// pretty-printed JSON.
    pub fn export_user(&mut self, owner_id: i64) -> Result<String, StoreError> {
        let tree = self.tag_tree(owner_id)?;
        let root = tree
            .root_index()
            .ok_or_else(|| StoreError::Internal(format!("user {owner_id} has no root tag")))?;
        let tags = export_tag(&tree, root);

        let tx = self.conn.transaction()?;
        let mut stmt = tx.prepare(
            "SELECT id FROM taggables WHERE owner_id = ?1 AND type = 'bookmark' ORDER BY id",
        )?;
        let ids = stmt
            .query_map(rusqlite::params![owner_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        drop(stmt);

        let mut bookmarks = Vec::with_capacity(ids.len());
        for id in ids {
            let data = bookmark_tx(&tx, id)?;
            let leafs = get_taggings_tx(&tx, id, TaggingMode::Leafs)?;
            let mut tags = Vec::with_capacity(leafs.len());
            for tag_id in leafs {
                let path = tree.path_of(tag_id).ok_or_else(|| {
                    StoreError::Internal(format!("tagging references unknown tag {tag_id}"))
                })?;
                tags.push(path.trim_start_matches('/').to_owned());
            }
            bookmarks.push(ExportBookmark {
                url: data.url,
                title: data.title,
                comment: data.comment,
                tags,
            });
        }
        tx.commit()?;

        Ok(serde_json::to_string_pretty(&ExportDoc { tags, bookmarks })?)
    }

    /// Imports a snapshot into a user, merging with whatever is already
    /// there. Existing tags are matched by name; bookmarks whose url the
    /// user already has are skipped.
    pub fn import_user(&mut self, owner_id: i64, json: &str) -> Result<ImportStats, StoreError> {
        let doc: ExportDoc = serde_json::from_str(json)?;
        let mut stats = ImportStats::default();

        let tx = self.conn.transaction()?;
        let root_id = root_tag_id_tx(&tx, owner_id)?;

        let mut stack: Vec<(TagId, &ExportTag)> =
            doc.tags.subtags.iter().map(|t| (root_id, t)).collect();
        while let Some((parent_id, tag)) = stack.pop() {
            let primary = tag
                .names
                .first()
                .ok_or(StoreError::InvalidInput("imported tag has no names"))?;
            let tag_id = match tag_id_by_name_tx(&tx, parent_id, primary)? {
                Some(id) => id,
                None => {
                    let new_tag = NewTag {
                        names: tag.names.clone(),
                        description: tag.description.clone(),
                        subtags: Vec::new(),
                    };
                    stats.tags_created += 1;
                    create_tag_batch_tx(&tx, owner_id, Some(parent_id), &new_tag)?
                }
            };
            for subtag in &tag.subtags {
                stack.push((tag_id, subtag));
            }
        }

        for bookmark in &doc.bookmarks {
            if !bookmark_ids_by_url_tx(&tx, owner_id, &bookmark.url)?.is_empty() {
                continue;
            }
            let new_bookmark = NewBookmark {
                url: bookmark.url.clone(),
                title: bookmark.title.clone(),
                comment: bookmark.comment.clone(),
            };
            let bookmark_id = create_bookmark_tx(&tx, owner_id, &new_bookmark)?;
            let mut tag_ids = Vec::with_capacity(bookmark.tags.len());
            for path in &bookmark.tags {
                tag_ids.push(ensure_tag_path_tx(&tx, owner_id, path)?);
            }
            set_taggings_tx(&tx, bookmark_id, &tag_ids, TaggingMode::Leafs)?;
            stats.bookmarks_created += 1;
        }

        tx.commit()?;
        self.tree_cache.invalidate(owner_id);
        info!(
            owner_id,
            tags = stats.tags_created,
            bookmarks = stats.bookmarks_created,
            "imported user snapshot"
        );
        Ok(stats)
    }
}

fn export_tag(tree: &TagTree, index: usize) -> ExportTag {
    let node = tree.node(index);
    ExportTag {
        names: node.names.clone(),
        description: node.description.clone(),
        subtags: node
            .children
            .iter()
            .map(|&child| export_tag(tree, child))
            .collect(),
    }
}
