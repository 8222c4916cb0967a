use super::{diff, Diff, ParentSource, TagHier};
use crate::TagId;

/// Fixed forest used across the closure tests:
///
/// ```text
/// 1            2          3
/// |- 4         |- 13      |- 16
/// |  |- 7         |- 14
/// |     |- 8      |- 15
/// |- 5
/// |  |- 9
/// |- 6
///    |- 10
///       |- 11
///       |- 12
/// ```
struct FixtureSource;

impl ParentSource for FixtureSource {
    type Error = String;

    fn parent_of(&mut self, id: TagId) -> Result<Option<TagId>, Self::Error> {
        match id {
            1 | 2 | 3 => Ok(None),
            4 | 5 | 6 => Ok(Some(1)),
            7 => Ok(Some(4)),
            8 => Ok(Some(7)),
            9 => Ok(Some(5)),
            10 => Ok(Some(6)),
            11 | 12 => Ok(Some(10)),
            13 => Ok(Some(2)),
            14 | 15 => Ok(Some(13)),
            16 => Ok(Some(3)),
            other => Err(format!("unknown tag id {other}")),
        }
    }
}

fn add(hier: &mut TagHier, id: TagId) {
    hier.add(&mut FixtureSource, id).expect("fixture lookup");
}

#[test]
fn closure_and_leafs() {
    let mut hier = TagHier::new();

    add(&mut hier, 4);
    assert_eq!(hier.leafs(), vec![4]);
    assert_eq!(hier.all(), vec![1, 4]);

    add(&mut hier, 7);
    assert_eq!(hier.leafs(), vec![7]);
    assert_eq!(hier.all(), vec![1, 4, 7]);

    // An ancestor of an existing member never becomes a leaf again.
    add(&mut hier, 1);
    assert_eq!(hier.leafs(), vec![7]);
    assert_eq!(hier.all(), vec![1, 4, 7]);

    add(&mut hier, 7);
    assert_eq!(hier.leafs(), vec![7]);
    assert_eq!(hier.all(), vec![1, 4, 7]);

    add(&mut hier, 5);
    assert_eq!(hier.leafs(), vec![5, 7]);
    assert_eq!(hier.all(), vec![1, 4, 5, 7]);

    add(&mut hier, 12);
    assert_eq!(hier.leafs(), vec![5, 7, 12]);
    assert_eq!(hier.all(), vec![1, 4, 5, 6, 7, 10, 12]);

    add(&mut hier, 9);
    assert_eq!(hier.leafs(), vec![7, 9, 12]);
    assert_eq!(hier.all(), vec![1, 4, 5, 6, 7, 9, 10, 12]);

    add(&mut hier, 3);
    assert_eq!(hier.leafs(), vec![3, 7, 9, 12]);
    assert_eq!(hier.all(), vec![1, 3, 4, 5, 6, 7, 9, 10, 12]);
}

#[test]
fn closure_is_idempotent() {
    let mut hier = TagHier::new();
    for _ in 0..3 {
        add(&mut hier, 8);
        add(&mut hier, 9);
    }
    assert_eq!(hier.leafs(), vec![8, 9]);
    assert_eq!(hier.all(), vec![1, 4, 5, 7, 8, 9]);
}

#[test]
fn leafs_form_antichain() {
    let mut hier = TagHier::new();
    for id in [8, 7, 4, 12, 10, 5, 9, 16] {
        add(&mut hier, id);
    }
    // No leaf may be an ancestor of another leaf.
    let leafs = hier.leafs();
    for &leaf in &leafs {
        let mut cur = hier.parent(leaf);
        while let Some(id) = cur {
            assert!(!leafs.contains(&id), "leaf {id} is an ancestor of {leaf}");
            cur = hier.parent(id);
        }
    }
    assert_eq!(leafs, vec![8, 9, 12, 16]);
}

#[test]
fn tracks_roots() {
    let mut hier = TagHier::new();
    add(&mut hier, 8);
    add(&mut hier, 9);
    assert_eq!(hier.roots(), vec![1]);

    add(&mut hier, 14);
    assert_eq!(hier.roots(), vec![1, 2]);
}

#[test]
fn failed_parent_lookup_aborts() {
    let mut hier = TagHier::new();
    let err = hier.add(&mut FixtureSource, 99).unwrap_err();
    assert!(err.contains("99"));
}

#[test]
fn parent_and_contains() {
    let mut hier = TagHier::new();
    add(&mut hier, 8);
    assert!(hier.contains(8));
    assert!(hier.contains(1));
    assert!(!hier.contains(2));
    assert_eq!(hier.parent(8), Some(7));
    assert_eq!(hier.parent(1), None);
    assert_eq!(hier.parent(2), None);
}

#[test]
fn diff_tables() {
    let cases: &[(&[TagId], &[TagId], &[TagId], &[TagId])] = &[
        (&[], &[1, 3, 4], &[1, 3, 4], &[]),
        (&[1, 4], &[1, 3, 4], &[3], &[]),
        (&[1, 4, 7, 9], &[1, 3, 4], &[3], &[7, 9]),
        (&[1, 4, 7, 9], &[], &[], &[1, 4, 7, 9]),
        (&[1, 4], &[1, 4], &[], &[]),
        (&[], &[], &[], &[]),
    ];
    for (current, desired, add, remove) in cases {
        let got = diff(current, desired);
        assert_eq!(
            got,
            Diff {
                add: add.to_vec(),
                remove: remove.to_vec()
            },
            "current {current:?} desired {desired:?}"
        );
    }
}

#[test]
fn diff_ignores_duplicates() {
    let got = diff(&[1, 1, 4], &[4, 4, 3, 3]);
    assert_eq!(
        got,
        Diff {
            add: vec![3],
            remove: vec![1]
        }
    );
}
