#![forbid(unsafe_code)]

use std::collections::HashMap;

use tm_core::matcher::{self, MatchPriority, PatternError, TagPath};
use tm_core::TagId;
use tracing::debug;

use super::tags::cleanup_tag_name;
use super::tree::TagTree;
use super::{SqliteStore, StoreError};

/// Hard cap on the number of pattern search results.
pub const MAX_PATTERN_RESULTS: usize = 20;

/// Where the new-tag suggestion lands in a result list that has room for
/// it: right after the best real match.
const NEW_TAG_SUGGESTION_INDEX: usize = 1;

/// One tag search result. A suggestion for a not-yet-existing tag carries
/// id -1 and a non-zero `new_tags_cnt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagHit {
    pub id: TagId,
    pub path: String,
    pub description: String,
    pub new_tags_cnt: usize,
}

pub(crate) struct FlatTag {
    id: TagId,
    description: String,
    path_items: Vec<Vec<String>>,
    matches: HashMap<usize, (usize, MatchPriority)>,
    deepest_depth: usize,
    deepest_priority: MatchPriority,
}

impl TagPath for FlatTag {
    fn path_items(&self) -> &[Vec<String>] {
        &self.path_items
    }

    fn display_path(&self) -> String {
        self.path_items
            .iter()
            .enumerate()
            .map(|(depth, aliases)| {
                let alias_idx = self.matches.get(&depth).map_or(0, |m| m.0);
                aliases[alias_idx].as_str()
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn record_match(&mut self, depth: usize, alias_idx: usize, priority: MatchPriority) {
        self.matches.insert(depth, (alias_idx, priority));
    }

    fn record_deepest(&mut self, depth: usize, priority: MatchPriority) {
        self.deepest_depth = depth;
        self.deepest_priority = priority;
    }

    fn deepest_depth(&self) -> usize {
        self.deepest_depth
    }

    fn deepest_priority(&self) -> MatchPriority {
        self.deepest_priority
    }
}

pub(crate) fn flatten_tree(tree: &TagTree) -> Vec<FlatTag> {
    let mut out = Vec::with_capacity(tree.len());
    let Some(root) = tree.root_index() else {
        return out;
    };

    let mut stack = vec![(root, Vec::new())];
    while let Some((idx, parent_items)) = stack.pop() {
        let node = tree.node(idx);
        let mut path_items = parent_items;
        path_items.push(node.names.clone());

        for &child in node.children.iter().rev() {
            stack.push((child, path_items.clone()));
        }

        out.push(FlatTag {
            id: node.id,
            description: node.description.clone(),
            path_items,
            matches: HashMap::new(),
            deepest_depth: 0,
            deepest_priority: MatchPriority::NoMatch,
        });
    }
    out
}

impl SqliteStore {
    /// Pattern search over an owner's tags, best match first, capped at
    /// [`MAX_PATTERN_RESULTS`].
    ///
    /// With `allow_new`, a suggestion for creating the tag named by the
    /// pattern is woven into the results whenever at least one of its
    /// path segments does not exist yet.
    pub fn tags_by_pattern(
        &mut self,
        owner_id: i64,
        pattern: &str,
        allow_new: bool,
    ) -> Result<Vec<TagHit>, StoreError> {
        let tree = self.tag_tree(owner_id)?;

        let filtered = matcher::filter(flatten_tree(&tree), pattern).map_err(pattern_error)?;
        debug!(owner_id, matched = filtered.len(), "tag pattern search");

        let mut hits: Vec<TagHit> = filtered
            .into_iter()
            .take(MAX_PATTERN_RESULTS)
            .map(|tag| TagHit {
                id: tag.id,
                path: tag.display_path(),
                description: tag.description.clone(),
                new_tags_cnt: 0,
            })
            .collect();

        if allow_new {
            if let Some(suggestion) = new_tag_suggestion(&tree, pattern) {
                if hits.len() > NEW_TAG_SUGGESTION_INDEX {
                    hits.insert(NEW_TAG_SUGGESTION_INDEX, suggestion);
                } else {
                    hits.push(suggestion);
                }
            }
        }

        Ok(hits)
    }
}

/// Builds the new-tag suggestion for a pattern, or `None` when the
/// pattern names an existing tag or yields no usable segments.
fn new_tag_suggestion(tree: &TagTree, pattern: &str) -> Option<TagHit> {
    let segments: Vec<String> = pattern
        .split('/')
        .map(cleanup_tag_name)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }

    let mut cur = tree.root_index()?;
    let mut new_tags_cnt = 0;
    for segment in &segments {
        if new_tags_cnt > 0 {
            new_tags_cnt += 1;
            continue;
        }
        let child = tree
            .node(cur)
            .children
            .iter()
            .copied()
            .find(|&idx| tree.node(idx).names.iter().any(|name| name == segment));
        match child {
            Some(idx) => cur = idx,
            None => new_tags_cnt = 1,
        }
    }
    if new_tags_cnt == 0 {
        return None;
    }

    Some(TagHit {
        id: -1,
        path: format!("/{}", segments.join("/")),
        description: "Non-existing tag".to_owned(),
        new_tags_cnt,
    })
}

fn pattern_error(err: PatternError) -> StoreError {
    match err {
        PatternError::TokenTooLong => StoreError::InvalidInput("pattern token is too long"),
        PatternError::FuzzyUnsupported => {
            StoreError::InvalidInput("fuzzy matching is not implemented")
        }
    }
}
