#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{params, Transaction};
use tm_core::TagId;
use tracing::trace;

use super::{SqliteStore, StoreError};

/// One tag in a [`TagTree`]. Children are arena indices, ordered by the
/// child's primary name.
#[derive(Clone, Debug)]
pub struct TagTreeNode {
    pub id: TagId,
    pub parent_id: Option<TagId>,
    pub description: String,
    /// All names, primary first.
    pub names: Vec<String>,
    pub children: Vec<usize>,
}

impl TagTreeNode {
    pub fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }
}

/// A user's whole tag hierarchy as a flat arena. Index 0 is not special;
/// use [`TagTree::root_index`] to find the root.
#[derive(Clone, Debug, Default)]
pub struct TagTree {
    nodes: Vec<TagTreeNode>,
    by_id: HashMap<TagId, usize>,
    root: Option<usize>,
}

impl TagTree {
    pub fn root_index(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, index: usize) -> &TagTreeNode {
        &self.nodes[index]
    }

    pub fn get(&self, id: TagId) -> Option<&TagTreeNode> {
        self.by_id.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn index_of(&self, id: TagId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Renders the "/"-joined primary-name path of a tag, e.g. "/a/b".
    /// The root's empty name supplies the leading slash.
    pub fn path_of(&self, id: TagId) -> Option<String> {
        let mut names = Vec::new();
        let mut cur = self.get(id)?;
        loop {
            names.push(cur.primary_name());
            match cur.parent_id {
                Some(parent_id) => cur = self.get(parent_id)?,
                None => break,
            }
        }
        names.reverse();
        Some(names.join("/"))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Per-owner cache of loaded tag trees. Every mutation of a user's tags
/// must invalidate the owner's entry.
#[derive(Debug, Default)]
pub struct TreeCache {
    trees: HashMap<i64, Arc<TagTree>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner_id: i64) -> Option<Arc<TagTree>> {
        self.trees.get(&owner_id).cloned()
    }

    pub fn put(&mut self, owner_id: i64, tree: Arc<TagTree>) {
        self.trees.insert(owner_id, tree);
    }

    pub fn invalidate(&mut self, owner_id: i64) {
        self.trees.remove(&owner_id);
    }
}

impl SqliteStore {
    /// Returns the owner's tag tree, loading it from the database on a
    /// cache miss.
    pub fn tag_tree(&mut self, owner_id: i64) -> Result<Arc<TagTree>, StoreError> {
        if let Some(tree) = self.tree_cache.get(owner_id) {
            trace!(owner_id, "tag tree cache hit");
            return Ok(tree);
        }

        let tx = self.conn.transaction()?;
        let tree = Arc::new(load_tag_tree_tx(&tx, owner_id)?);
        tx.commit()?;

        self.tree_cache.put(owner_id, Arc::clone(&tree));
        Ok(tree)
    }
}

pub(crate) fn load_tag_tree_tx(
    tx: &Transaction<'_>,
    owner_id: i64,
) -> Result<TagTree, StoreError> {
    let mut nodes = Vec::new();
    let mut by_id = HashMap::new();

    let mut stmt =
        tx.prepare("SELECT id, parent_id, descr FROM tags WHERE owner_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok((
            row.get::<_, TagId>(0)?,
            row.get::<_, Option<TagId>>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    for row in rows {
        let (id, parent_id, description) = row?;
        by_id.insert(id, nodes.len());
        nodes.push(TagTreeNode {
            id,
            parent_id,
            description,
            names: Vec::new(),
            children: Vec::new(),
        });
    }
    drop(stmt);

    let mut stmt = tx.prepare(
        "SELECT n.tag_id, n.name FROM tag_names n \
         JOIN tags t ON t.id = n.tag_id \
         WHERE t.owner_id = ?1 ORDER BY n.is_primary DESC, n.name",
    )?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok((row.get::<_, TagId>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (tag_id, name) = row?;
        let idx = *by_id
            .get(&tag_id)
            .ok_or_else(|| StoreError::Internal(format!("name for unknown tag {tag_id}")))?;
        nodes[idx].names.push(name);
    }
    drop(stmt);

    let mut root = None;
    for idx in 0..nodes.len() {
        match nodes[idx].parent_id {
            None => {
                if root.is_some() {
                    return Err(StoreError::Internal(format!(
                        "user {owner_id} has more than one root tag"
                    )));
                }
                root = Some(idx);
            }
            Some(parent_id) => {
                let parent_idx = *by_id.get(&parent_id).ok_or_else(|| {
                    StoreError::Internal(format!("tag {} has unknown parent", nodes[idx].id))
                })?;
                nodes[parent_idx].children.push(idx);
            }
        }
    }

    for idx in 0..nodes.len() {
        let mut children = std::mem::take(&mut nodes[idx].children);
        children.sort_by(|&a, &b| nodes[a].primary_name().cmp(nodes[b].primary_name()));
        nodes[idx].children = children;
    }

    Ok(TagTree { nodes, by_id, root })
}
