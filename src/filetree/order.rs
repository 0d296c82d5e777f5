//! Child-ordering strategies for deterministic traversal and rendering.

use std::str::FromStr;

use super::node::NodeId;
use super::tree::FileTree;

/// Active ordering over a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lexicographic by name, ascending.
    #[default]
    ByName,
    /// Recursive size descending; ties broken by name ascending.
    BySizeDesc,
}

impl SortOrder {
    /// Orders the children of `id`. Total and deterministic for equal inputs.
    pub(crate) fn order_children(self, tree: &FileTree, id: NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = tree.node(id).children.values().copied().collect();
        match self {
            // BTreeMap iteration is already name-ordered.
            SortOrder::ByName => {}
            SortOrder::BySizeDesc => {
                ids.sort_by(|a, b| {
                    tree.size_of(*b)
                        .cmp(&tree.size_of(*a))
                        .then_with(|| tree.node(*a).name.cmp(&tree.node(*b).name))
                });
            }
        }
        ids
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortOrder::ByName),
            "size" => Ok(SortOrder::BySizeDesc),
            other => Err(format!("unknown sort order '{other}' (expected 'name' or 'size')")),
        }
    }
}
