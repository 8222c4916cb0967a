use std::collections::HashMap;

use super::{filter, MatchPriority, PatternError, TagPath, MAX_TOKEN_LEN};

struct TestTag {
    path_items: Vec<Vec<String>>,
    matches: HashMap<usize, (usize, MatchPriority)>,
    deepest_depth: usize,
    deepest_priority: MatchPriority,
}

impl TestTag {
    /// Builds a tag from a path string like "/a/b|alias/c". Components are
    /// "/"-separated, aliases within a component "|"-separated. A leading
    /// "/" produces the empty root component.
    fn new(path: &str) -> Self {
        TestTag {
            path_items: path
                .split('/')
                .map(|part| part.split('|').map(str::to_owned).collect())
                .collect(),
            matches: HashMap::new(),
            deepest_depth: 0,
            deepest_priority: MatchPriority::NoMatch,
        }
    }
}

impl TagPath for TestTag {
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

fn filter_paths(paths: &[&str], pattern: &str) -> Vec<String> {
    let tags = paths.iter().map(|p| TestTag::new(p)).collect();
    filter(tags, pattern)
        .expect("pattern is valid")
        .iter()
        .map(TestTag::display_path)
        .collect()
}

fn assert_filtered(paths: &[&str], pattern: &str, expected: &[&str]) {
    assert_eq!(filter_paths(paths, pattern), expected, "pattern {pattern:?}");
}

#[test]
fn matching_is_case_insensitive_and_keeps_original_case() {
    let tags = &["/FOObar", "/FOObar/asdQWE", "/FOObar/asdQWE/XXyy"];

    assert_filtered(tags, "oba/xy", &["/FOObar/asdQWE/XXyy"]);
    assert_filtered(tags, "obA/xY", &["/FOObar/asdQWE/XXyy"]);
}

#[test]
fn matching_is_case_insensitive_unicode() {
    let tags = &["/ПреВед", "/ПреВед/Раздва/", "/ПреВед/Раздва/ТРи"];

    assert_filtered(tags, "ев/рИ", &["/ПреВед/Раздва/ТРи"]);
}

const TAGS: &[&str] = &[
    "/computer",
    "/computer/programming",
    "/computer/programming/ruby",
    "/computer/programming/python",
    "/computer/programming/c++",
    "/computer/programming/c",
    "/computer/programming/go|golang",
    "/computer/programming/javascript",
    "/computer/linux",
    "/computer/linux/udev",
    "/computer/linux/systemd",
    "/computer/linux/kernel",
    "/life",
    "/life/sport",
    "/life/sport/bike|bicycle",
    "/life/sport/kayak",
];

#[test]
fn ranks_by_priority_then_distance_then_depth_then_path() {
    assert_filtered(
        TAGS,
        "c",
        &[
            "/computer/programming/c",
            "/computer/programming/c++",
            "/computer",
            "/computer/linux",
            "/computer/programming",
            "/computer/linux/kernel",
            "/computer/linux/systemd",
            "/computer/linux/udev",
            "/computer/programming/go",
            "/computer/programming/python",
            "/computer/programming/ruby",
            "/computer/programming/javascript",
            "/life/sport/bicycle",
        ],
    );

    assert_filtered(
        TAGS,
        "p",
        &[
            "/computer/programming/python",
            "/computer/programming",
            "/computer/programming/c",
            "/computer/programming/c++",
            "/computer/programming/go",
            "/computer/programming/ruby",
            "/computer/programming/javascript",
            "/life/sport",
            "/computer",
            "/life/sport/bike",
            "/life/sport/kayak",
            "/computer/linux",
            "/computer/linux/kernel",
            "/computer/linux/systemd",
            "/computer/linux/udev",
        ],
    );
}

#[test]
fn alias_matches_render_the_matched_alias() {
    assert_filtered(TAGS, "go", &["/computer/programming/go"]);
    assert_filtered(TAGS, "gol", &["/computer/programming/golang"]);
}

#[test]
fn slash_separated_parts_match_bottom_up() {
    assert_filtered(
        TAGS,
        "prog/p",
        &[
            "/computer/programming/python",
            "/computer/programming/javascript",
        ],
    );

    assert_filtered(
        TAGS,
        "li/ke",
        &["/computer/linux/kernel", "/life/sport/bike"],
    );

    // Leading slash adds an empty part which matches the root.
    assert_filtered(
        TAGS,
        "/li/ke",
        &["/computer/linux/kernel", "/life/sport/bike"],
    );
}

#[test]
fn empty_parts_match_anything() {
    assert_filtered(
        TAGS,
        "///k",
        &[
            "/computer/linux/kernel",
            "/life/sport/kayak",
            "/life/sport/bike",
        ],
    );
}

#[test]
fn whitespace_tokens_intersect() {
    assert_filtered(
        TAGS,
        "li com",
        &[
            "/computer/linux",
            "/computer/linux/kernel",
            "/computer/linux/systemd",
            "/computer/linux/udev",
        ],
    );
}

#[test]
fn equal_names_rank_deepest_first() {
    let tags = &["/foo", "/foo/foo", "/foo/foo/foo"];
    let expected = &["/foo/foo/foo", "/foo/foo", "/foo"];

    assert_filtered(tags, "f", expected);
    assert_filtered(tags, "foo", expected);
}

#[test]
fn dead_token_voids_everything() {
    assert_filtered(TAGS, "nosuchtag", &[]);
    assert_filtered(TAGS, "li nosuchtag", &[]);
}

#[test]
fn kind_prefixes_are_stripped_from_the_token() {
    assert_filtered(TAGS, "=go", &["/computer/programming/go"]);
    assert_filtered(TAGS, "=~go", &["/computer/programming/go"]);
    assert_filtered(TAGS, "~=go", &["/computer/programming/go"]);
}

#[test]
fn overlong_token_is_rejected() {
    let long = "a".repeat(MAX_TOKEN_LEN + 1);
    let tags = vec![TestTag::new("/foo")];
    match filter(tags, &long) {
        Err(PatternError::TokenTooLong) => {}
        Err(other) => panic!("expected TokenTooLong, got {other:?}"),
        Ok(_) => panic!("expected TokenTooLong, got a result"),
    }

    // The prefix does not count against the limit.
    let ok = format!("={}", "a".repeat(MAX_TOKEN_LEN));
    let tags = vec![TestTag::new("/foo")];
    assert!(filter(tags, &ok).is_ok());
}

#[test]
fn fuzzy_prefix_is_rejected() {
    let tags = vec![TestTag::new("/foo")];
    match filter(tags, "~foo") {
        Err(PatternError::FuzzyUnsupported) => {}
        Err(other) => panic!("expected FuzzyUnsupported, got {other:?}"),
        Ok(_) => panic!("expected FuzzyUnsupported, got a result"),
    }
}

#[test]
fn empty_pattern_keeps_everything() {
    let got = filter_paths(&["/a", "/b"], "");
    assert_eq!(got.len(), 2);
}
