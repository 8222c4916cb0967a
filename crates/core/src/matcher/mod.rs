#![forbid(unsafe_code)]

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;

mod exact;
mod path;
mod result;

#[cfg(test)]
mod tests;

pub use path::TagPath;
pub use result::MatchPriority;

/// Longest accepted pattern token, in characters, after the kind prefix
/// is stripped.
pub const MAX_TOKEN_LEN: usize = 30;

/// Matching strategy requested by a token prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatcherKind {
    Exact,
    /// Reserved; requesting it is an input error for now.
    Fuzzy,
    ExactThenFuzzy,
}

#[derive(Debug)]
pub enum PatternError {
    TokenTooLong,
    FuzzyUnsupported,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::TokenTooLong => {
                write!(f, "pattern token is longer than {MAX_TOKEN_LEN} chars")
            }
            PatternError::FuzzyUnsupported => write!(f, "fuzzy matching is not implemented"),
        }
    }
}

impl std::error::Error for PatternError {}

fn split_kind(token: &str) -> (MatcherKind, &str) {
    if let Some(rest) = token.strip_prefix("=~").or_else(|| token.strip_prefix("~=")) {
        (MatcherKind::ExactThenFuzzy, rest)
    } else if let Some(rest) = token.strip_prefix('=') {
        (MatcherKind::Exact, rest)
    } else if let Some(rest) = token.strip_prefix('~') {
        (MatcherKind::Fuzzy, rest)
    } else {
        (MatcherKind::ExactThenFuzzy, token)
    }
}

/// Filters `tags` down to those matching every whitespace-delimited token
/// of `pattern` and orders them best match first.
///
/// Ranking compares, in order: the priority of each tag's deepest-matched
/// component, that component's distance from the end of the path, the
/// absolute depth of that component (deeper wins), and finally the
/// rendered path.
pub fn filter<T: TagPath>(mut tags: Vec<T>, pattern: &str) -> Result<Vec<T>, PatternError> {
    let mut hits: Vec<HashSet<usize>> = Vec::new();
    for raw in pattern.split_whitespace() {
        let (kind, token) = split_kind(raw);
        if token.chars().count() > MAX_TOKEN_LEN {
            return Err(PatternError::TokenTooLong);
        }
        match kind {
            MatcherKind::Exact | MatcherKind::ExactThenFuzzy => {
                hits.extend(exact::filter(&mut tags, token));
            }
            MatcherKind::Fuzzy => return Err(PatternError::FuzzyUnsupported),
        }
    }

    let mut survivors: Vec<(T, usize)> = tags
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| hits.iter().all(|set| set.contains(idx)))
        .map(|(_, tag)| tag)
        .map(|tag| {
            let depth = tag.deepest_depth();
            (tag, depth)
        })
        .collect();

    survivors.sort_by(|(a, a_depth), (b, b_depth)| {
        let a_key = (
            a.deepest_priority(),
            a.path_items().len().saturating_sub(a_depth + 1),
            Reverse(*a_depth),
        );
        let b_key = (
            b.deepest_priority(),
            b.path_items().len().saturating_sub(b_depth + 1),
            Reverse(*b_depth),
        );
        a_key
            .cmp(&b_key)
            .then_with(|| a.display_path().cmp(&b.display_path()))
    });

    Ok(survivors.into_iter().map(|(tag, _)| tag).collect())
}
