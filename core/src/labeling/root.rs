//! Container location — pick the ancestor that most plausibly owns the Items.
//!
//! The real container is not known ahead of time, and hosts often wrap it in
//! several intermediate elements. Every ancestor within a bounded distance of
//! each Item gets a vote; the ancestor with the most votes wins, so wrapper
//! levels compete instead of the immediate parent always winning.

use std::collections::HashMap;

use crate::tree::Tree;


/// Locate the container for the Items currently in the tree.
pub fn find_container<T: Tree>(tree: &T, max_depth: usize) -> Option<T::Node> {
    let items = tree.items(None);
    locate(tree, &items, max_depth)
}


/// Locate the container for `items`.
///
/// # Algorithm
///
/// 1. For each Item, walk up at most `max_depth` ancestors, stopping at the
///    document root (which never gets a vote).
/// 2. Every ancestor visited gets one vote per Item below it.
/// 3. The ancestor with the strictly greatest count wins; ties go to the
///    ancestor seen first.
/// 4. Without any vote, fall back to the first Item's parent, then to the
///    document root.
///
/// Returns `None` only when there are no Items.
pub fn locate<T: Tree>(tree: &T, items: &[T::Node], max_depth: usize) -> Option<T::Node> {
    let first = *items.first()?;
    let document_root = tree.root();

    let mut counts: HashMap<T::Node, usize> = HashMap::new();
    // First-sighting order, for the tie-break.
    let mut seen: Vec<T::Node> = Vec::new();
    for &item in items {
        let mut ancestor = tree.parent(item);
        let mut depth = 0;
        while let Some(a) = ancestor {
            if Some(a) == document_root || depth >= max_depth {
                break;
            }
            let count = counts.entry(a).or_insert(0);
            if *count == 0 {
                seen.push(a);
            }
            *count += 1;
            ancestor = tree.parent(a);
            depth += 1;
        }
    }

    let mut best: Option<(T::Node, usize)> = None;
    for &node in &seen {
        let count = counts[&node];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((node, count));
        }
    }

    let container = best
        .map(|(node, _)| node)
        .or_else(|| tree.parent(first))
        .or(document_root);
    tracing::debug!(
        target: "settle::root",
        items = items.len(),
        candidates = counts.len(),
        container = ?container,
        "located container"
    );
    container
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::mem::MemTree;

    const MARK: &str = "item";

    #[test]
    fn no_items_means_no_container() {
        let tree = MemTree::new(MARK);
        assert_eq!(find_container(&tree, 10), None);
    }

    #[test]
    fn single_list_resolves_to_its_parent() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let list = tree.element(root, Some("list"), "").unwrap();
        for t in ["a", "b", "c"] {
            tree.item(list, t).unwrap();
        }
        assert_eq!(find_container(&tree, 10), Some(list));
    }

    #[test]
    fn wrapper_over_two_sublists_wins() {
        // wrapper
        // ├── left  (3 items)
        // └── right (2 items)
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let wrapper = tree.element(root, None, "").unwrap();
        let left = tree.element(wrapper, None, "").unwrap();
        let right = tree.element(wrapper, None, "").unwrap();
        for t in ["a", "b", "c"] {
            tree.item(left, t).unwrap();
        }
        for t in ["d", "e"] {
            tree.item(right, t).unwrap();
        }
        assert_eq!(find_container(&tree, 10), Some(wrapper));
    }

    #[test]
    fn tie_goes_to_first_seen_ancestor() {
        // outer > inner > items: both see every item; inner is seen first.
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let outer = tree.element(root, None, "").unwrap();
        let inner = tree.element(outer, None, "").unwrap();
        tree.item(inner, "a").unwrap();
        tree.item(inner, "b").unwrap();
        for _ in 0..5 {
            assert_eq!(find_container(&tree, 10), Some(inner));
        }
    }

    #[test]
    fn items_directly_under_root_fall_back_to_root() {
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        tree.item(root, "a").unwrap();
        assert_eq!(find_container(&tree, 10), Some(root));
    }

    #[test]
    fn depth_bound_limits_votes() {
        // Deep chain: only the nearest `max_depth` ancestors vote.
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let mut parent = root;
        let mut chain = Vec::new();
        for _ in 0..4 {
            parent = tree.element(parent, None, "").unwrap();
            chain.push(parent);
        }
        let deep = tree.item(parent, "deep").unwrap();
        let shallow = tree.item(chain[0], "shallow").unwrap();

        // With depth 1 each item votes only for its parent; the deep parent
        // is seen first and ties win by first sighting.
        assert_eq!(locate(&tree, &[deep, shallow], 1), Some(chain[3]));
        // With full depth chain[0] collects both votes.
        assert_eq!(locate(&tree, &[deep, shallow], 10), Some(chain[0]));
    }

    #[test]
    fn long_list_under_wrappers_resolves_to_the_widest_owner() {
        // page > scroller > list > 500 rows > item, plus a stray item in page.
        let mut tree = MemTree::new(MARK);
        let root = tree.root_id();
        let page = tree.element(root, None, "").unwrap();
        let scroller = tree.element(page, None, "").unwrap();
        let list = tree.element(scroller, None, "").unwrap();
        for i in 0..500 {
            let row = tree.element(list, None, "").unwrap();
            tree.item(row, &format!("Set {}", i)).unwrap();
        }
        tree.item(page, "stray").unwrap();
        // list, scroller and page tie at 500 from the rows; page also gets
        // the stray vote.
        assert_eq!(find_container(&tree, 10), Some(page));
        // With depth 3 page is out of reach of the rows and list is seen first.
        assert_eq!(find_container(&tree, 3), Some(list));
    }
}
