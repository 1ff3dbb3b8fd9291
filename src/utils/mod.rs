//! Small helpers shared by state modules and the hydration boundary.

mod script;
mod tree;

pub use script::escape_script_json;
pub use tree::{TreeItem, TreeNode, list_to_tree};
