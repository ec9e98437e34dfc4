//! Permission tree: hierarchy, selection propagation and change-set diff.

pub mod diff;
pub mod hierarchy;
pub mod selection;

pub use diff::{compute_change_set, ChangeSet, PermissionMap};
pub use hierarchy::{build_hierarchy, Hierarchy, ModuleNode, PageNode};
pub use selection::{GrantSet, PermissionSelection, SelectionChange, SelectionTree};
