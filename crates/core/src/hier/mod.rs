#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use crate::TagId;

#[cfg(test)]
mod tests;

/// Parent lookup capability for [`TagHier`]. `Ok(None)` means `id` is a
/// forest root.
pub trait ParentSource {
    type Error;

    fn parent_of(&mut self, id: TagId) -> Result<Option<TagId>, Self::Error>;
}

#[derive(Clone, Debug)]
struct HierItem {
    parent: Option<TagId>,
    children: BTreeSet<TagId>,
}

/// Upward transitive closure of a set of tag ids.
///
/// Ids passed to [`TagHier::add`] are the explicit ("leaf") members; every
/// ancestor walked in on the way to the root becomes a non-leaf member. An
/// id that is an ancestor of another member is never reported as a leaf,
/// even if it was explicitly supplied earlier.
///
/// An instance is single-use: if a parent lookup fails mid-resolution the
/// partially filled structure must be discarded.
#[derive(Clone, Debug, Default)]
pub struct TagHier {
    items: BTreeMap<TagId, HierItem>,
    leafs: BTreeSet<TagId>,
    roots: BTreeSet<TagId>,
}

impl TagHier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` as an explicit member and pulls in its whole ancestor
    /// chain. Idempotent for ids already known with the same leaf-ness.
    pub fn add<S: ParentSource>(&mut self, source: &mut S, id: TagId) -> Result<(), S::Error> {
        let mut cur = id;
        let mut is_leaf = true;
        let mut child: Option<TagId> = None;
        loop {
            if let Some(item) = self.items.get_mut(&cur) {
                // Known id: ancestors are already registered, only the leaf
                // bookkeeping and the child link can change.
                if is_leaf {
                    if item.children.is_empty() {
                        self.leafs.insert(cur);
                    }
                } else {
                    if let Some(child_id) = child {
                        item.children.insert(child_id);
                    }
                    self.leafs.remove(&cur);
                }
                return Ok(());
            }

            let parent = source.parent_of(cur)?;
            let mut item = HierItem {
                parent,
                children: BTreeSet::new(),
            };
            if let Some(child_id) = child {
                item.children.insert(child_id);
            }
            self.items.insert(cur, item);
            if is_leaf {
                self.leafs.insert(cur);
            }

            match parent {
                None => {
                    self.roots.insert(cur);
                    return Ok(());
                }
                Some(parent_id) => {
                    child = Some(cur);
                    cur = parent_id;
                    is_leaf = false;
                }
            }
        }
    }

    /// Members that no other member descends from, ascending.
    pub fn leafs(&self) -> Vec<TagId> {
        self.leafs.iter().copied().collect()
    }

    /// The full closure (leafs plus ancestors), ascending.
    pub fn all(&self) -> Vec<TagId> {
        self.items.keys().copied().collect()
    }

    /// Forest roots reached by the resolution. More than one root means the
    /// input spanned several forests, which callers treat as an internal
    /// invariant violation.
    pub fn roots(&self) -> Vec<TagId> {
        self.roots.iter().copied().collect()
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn parent(&self, id: TagId) -> Option<TagId> {
        self.items.get(&id).and_then(|item| item.parent)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Minimal change set turning `current` into `desired`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    pub add: Vec<TagId>,
    pub remove: Vec<TagId>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Computes `desired - current` and `current - desired`. Duplicates in
/// either input are treated as a set; both outputs are sorted ascending.
pub fn diff(current: &[TagId], desired: &[TagId]) -> Diff {
    let current: BTreeSet<TagId> = current.iter().copied().collect();
    let desired: BTreeSet<TagId> = desired.iter().copied().collect();
    Diff {
        add: desired.difference(&current).copied().collect(),
        remove: current.difference(&desired).copied().collect(),
    }
}
