use super::result::MatchPriority;

/// A tag path as seen by the matcher. One entry per path component, each
/// holding the component's aliases in their original casing. The root
/// component of an absolute path has a single empty alias, so rendered
/// paths start with "/".
pub trait TagPath {
    fn path_items(&self) -> &[Vec<String>];

    /// Renders the path using, at every depth, the alias that matched (or
    /// the primary alias where nothing did), joined with "/".
    fn display_path(&self) -> String;

    /// Stores which alias matched at `depth` and how well.
    fn record_match(&mut self, depth: usize, alias_idx: usize, priority: MatchPriority);

    /// Stores the deepest matched depth and the priority of that match.
    fn record_deepest(&mut self, depth: usize, priority: MatchPriority);

    fn deepest_depth(&self) -> usize;

    fn deepest_priority(&self) -> MatchPriority;
}

/// Records a match, promoting the deepest-match bookkeeping only when the
/// new match is strictly deeper than anything seen so far. Depth 0 never
/// wins because the initial deepest depth is 0.
pub(crate) fn record<T: TagPath + ?Sized>(
    tag: &mut T,
    depth: usize,
    alias_idx: usize,
    priority: MatchPriority,
) {
    tag.record_match(depth, alias_idx, priority);
    if depth > tag.deepest_depth() {
        tag.record_deepest(depth, priority);
    }
}
