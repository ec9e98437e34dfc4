//! Stored grants vs. tree selection.
//!
//! Both the SQL preview and the direct apply path in the repository go
//! through [`compute_change_set`], so the script an operator reviews and
//! the rows actually written cannot disagree.

use super::selection::{GrantSet, PermissionSelection};
use crate::models::{PermissionTarget, RolePermission};
use serde::Serialize;
use std::collections::BTreeMap;

/// A role's stored grants keyed by the node they grant.
#[derive(Debug, Clone, Default)]
pub struct PermissionMap {
    entries: BTreeMap<PermissionTarget, Vec<RolePermission>>,
}

impl PermissionMap {
    pub fn from_permissions(permissions: impl IntoIterator<Item = RolePermission>) -> Self {
        let mut entries: BTreeMap<PermissionTarget, Vec<RolePermission>> = BTreeMap::new();
        for permission in permissions {
            let Some(target) = permission.classify() else {
                tracing::warn!(
                    permission_id = permission.id,
                    role_id = permission.role_id,
                    "Skipping role permission without a hierarchy level"
                );
                continue;
            };
            if permission.target().is_err() {
                tracing::warn!(
                    permission_id = permission.id,
                    role_id = permission.role_id,
                    level = ?target.level(),
                    "Role permission references more than one level"
                );
            }
            entries.entry(target).or_default().push(permission);
        }
        Self { entries }
    }

    pub fn contains(&self, target: PermissionTarget) -> bool {
        self.entries.contains_key(&target)
    }

    pub fn get(&self, target: PermissionTarget) -> Option<&[RolePermission]> {
        self.entries.get(&target).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selection with exactly the stored nodes checked.
    pub fn selection(&self) -> PermissionSelection {
        let mut selection = PermissionSelection::default();
        for target in self.entries.keys() {
            selection.set(*target, true);
        }
        selection
    }
}

/// What has to happen to stored grants to match a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub to_add: GrantSet,
    /// Ascending by permission id.
    pub to_remove: Vec<RolePermission>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Checked-but-not-stored nodes go to `to_add`; stored rows whose node is
/// unchecked or absent from the selection go to `to_remove`.
pub fn compute_change_set(original: &PermissionMap, selection: &PermissionSelection) -> ChangeSet {
    fn missing(
        original: &PermissionMap,
        flags: &BTreeMap<i64, bool>,
        target: fn(i64) -> PermissionTarget,
    ) -> Vec<i64> {
        flags
            .iter()
            .filter(|(&id, &checked)| checked && !original.contains(target(id)))
            .map(|(&id, _)| id)
            .collect()
    }

    let to_add = GrantSet {
        module_ids: missing(original, &selection.modules, PermissionTarget::Module),
        page_ids: missing(original, &selection.pages, PermissionTarget::Page),
        operation_ids: missing(original, &selection.operations, PermissionTarget::Operation),
    };

    let mut to_remove: Vec<RolePermission> = original
        .entries
        .iter()
        .filter(|(target, _)| !selection.is_checked(**target))
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect();
    to_remove.sort_by_key(|p| p.id);

    ChangeSet { to_add, to_remove }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, target: PermissionTarget) -> RolePermission {
        let (page_id, module_id, operation_id) = target.columns();
        RolePermission {
            id,
            role_id: 2,
            page_id,
            module_id,
            operation_id,
        }
    }

    fn super_user() -> PermissionMap {
        PermissionMap::from_permissions(vec![
            row(1, PermissionTarget::Module(1)),
            row(21, PermissionTarget::Module(2)),
            row(22, PermissionTarget::Module(5)),
            row(23, PermissionTarget::Module(12)),
            row(30, PermissionTarget::Page(15)),
            row(31, PermissionTarget::Operation(57)),
        ])
    }

    #[test]
    fn test_unchanged_selection_is_empty_diff() {
        let map = super_user();
        let change_set = compute_change_set(&map, &map.selection());
        assert!(change_set.is_empty());

        // running it again still yields nothing
        let again = compute_change_set(&map, &map.selection());
        assert_eq!(change_set, again);
    }

    #[test]
    fn test_additions_are_partitioned_by_level() {
        let map = super_user();
        let mut selection = map.selection();
        selection.set(PermissionTarget::Module(3), true);
        selection.set(PermissionTarget::Page(17), true);
        selection.set(PermissionTarget::Operation(58), true);
        selection.set(PermissionTarget::Operation(2), true);
        selection.set(PermissionTarget::Operation(9), false);

        let change_set = compute_change_set(&map, &selection);
        assert_eq!(change_set.to_add.module_ids, vec![3]);
        assert_eq!(change_set.to_add.page_ids, vec![17]);
        assert_eq!(change_set.to_add.operation_ids, vec![2, 58]);
        assert!(change_set.to_remove.is_empty());
    }

    #[test]
    fn test_unchecked_and_absent_entries_are_removed() {
        let map = super_user();
        let mut selection = map.selection();
        selection.set(PermissionTarget::Module(5), false);
        selection.operations.remove(&57);

        let change_set = compute_change_set(&map, &selection);
        let removed: Vec<i64> = change_set.to_remove.iter().map(|p| p.id).collect();
        assert_eq!(removed, vec![22, 31]);
        assert!(change_set.to_add.is_empty());
    }

    #[test]
    fn test_levels_are_independent_keyspaces() {
        // module 15 and page 15 are different nodes
        let map = PermissionMap::from_permissions(vec![row(1, PermissionTarget::Page(15))]);
        let mut selection = PermissionSelection::default();
        selection.set(PermissionTarget::Module(15), true);

        let change_set = compute_change_set(&map, &selection);
        assert_eq!(change_set.to_add.module_ids, vec![15]);
        assert_eq!(change_set.to_remove.len(), 1);
    }

    #[test]
    fn test_duplicate_rows_are_all_removed() {
        let map = PermissionMap::from_permissions(vec![
            row(4, PermissionTarget::Module(5)),
            row(9, PermissionTarget::Module(5)),
        ]);
        assert_eq!(map.len(), 1);

        let change_set = compute_change_set(&map, &PermissionSelection::default());
        let removed: Vec<i64> = change_set.to_remove.iter().map(|p| p.id).collect();
        assert_eq!(removed, vec![4, 9]);
    }

    #[test]
    fn test_rows_without_level_are_ignored() {
        let empty = RolePermission {
            id: 3,
            role_id: 2,
            page_id: None,
            module_id: None,
            operation_id: None,
        };
        let map = PermissionMap::from_permissions(vec![empty]);
        assert!(map.is_empty());
    }
}
