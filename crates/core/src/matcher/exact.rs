use std::collections::HashSet;

use super::path::{self, TagPath};
use super::result::{classify, MatchPriority};

/// Runs one whitespace-delimited token against every tag and returns the
/// hit set per "/"-separated part.
///
/// Parts are matched deepest-first. Each tag carries a cursor holding the
/// depth its previous part matched at; the next (shallower) part may only
/// match strictly above that, so `prog/go` matches `programming/golang`
/// but not the other way around. A part that matches no tag at all yields
/// a single empty hit set, which voids every tag at the combine stage.
pub(crate) fn filter<T: TagPath>(tags: &mut [T], token: &str) -> Vec<HashSet<usize>> {
    let parts: Vec<String> = token.split('/').map(|p| p.to_lowercase()).collect();

    let mut cursor: Vec<usize> = tags.iter().map(|t| t.path_items().len()).collect();
    let mut hits = Vec::new();

    for part in parts.iter().rev() {
        let mut matched = HashSet::new();
        for (idx, tag) in tags.iter_mut().enumerate() {
            let mut found: Option<(usize, usize, MatchPriority)> = None;
            'depths: for depth in (0..cursor[idx]).rev() {
                for (alias_idx, alias) in tag.path_items()[depth].iter().enumerate() {
                    let priority = classify(&alias.to_lowercase(), part);
                    if priority != MatchPriority::NoMatch {
                        found = Some((depth, alias_idx, priority));
                        break 'depths;
                    }
                }
            }
            if let Some((depth, alias_idx, priority)) = found {
                matched.insert(idx);
                cursor[idx] = depth;
                path::record(tag, depth, alias_idx, priority);
            }
        }
        if matched.is_empty() {
            return vec![matched];
        }
        hits.push(matched);
    }

    hits
}
