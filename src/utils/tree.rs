//! Builds a forest out of a flat list of items that reference their parent by id.
//!
//! ```text
//! [a, b(parent=a), c(parent=a), d(parent=zz)]  ──►  a ─┬─ b
//!                                                      └─ c
//!                                                   d            (unknown parent → root)
//! ```
//!
//! Sibling order follows input order. Items caught in a parent cycle are not
//! reachable from any root and are left out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An item that knows its own id and, optionally, its parent's id.
pub trait TreeItem {
    /// Unique id of the item.
    fn id(&self) -> &str;

    /// Id of the parent item, if any.
    fn parent_id(&self) -> Option<&str>;
}

/// Node of the derived hierarchy: the item plus its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(default = "Vec::new")]
    pub children: Vec<TreeNode<T>>,
}

/// Converts a flat list into a forest of [`TreeNode`]s.
pub fn list_to_tree<T: TreeItem + Clone>(items: &[T]) -> Vec<TreeNode<T>> {
    let index: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item.parent_id().and_then(|p| index.get(p)) {
            Some(&p) if p != i => children[p].push(i),
            _ => roots.push(i),
        }
    }

    roots
        .into_iter()
        .map(|i| build(items, &children, i))
        .collect()
}

fn build<T: Clone>(items: &[T], children: &[Vec<usize>], i: usize) -> TreeNode<T> {
    TreeNode {
        item: items[i].clone(),
        children: children[i]
            .iter()
            .map(|&c| build(items, children, c))
            .collect(),
    }
}
