/// How well an alias matched a pattern part. Variants are declared best
/// first, so the derived `Ord` is the ranking order. `Fuzzy` is reserved
/// for a matcher that is not implemented yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchPriority {
    Exact,
    Begin,
    End,
    Middle,
    Fuzzy,
    NoMatch,
}

/// Classifies how `alias` matches `part`. Both arguments must already be
/// lowercased.
pub(crate) fn classify(alias: &str, part: &str) -> MatchPriority {
    if alias == part {
        MatchPriority::Exact
    } else if alias.starts_with(part) {
        MatchPriority::Begin
    } else if alias.ends_with(part) {
        MatchPriority::End
    } else if alias.contains(part) {
        MatchPriority::Middle
    } else {
        MatchPriority::NoMatch
    }
}
