//! Checked state of the permission tree.
//!
//! [`PermissionSelection`] is the plain data (three id → bool maps) that a
//! UI round-trips. [`SelectionTree`] pairs it with a [`Hierarchy`] and
//! enforces propagation: descendants follow a toggled node, and after
//! every toggle the affected ancestors are recomputed from their children
//! instead of being flipped on their own.

use super::hierarchy::{Hierarchy, ModuleNode, PageNode};
use crate::error::{AppError, Result};
use crate::models::{PermissionTarget, RolePermission};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Checked flags per level, keyed by entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSelection {
    #[serde(default)]
    pub modules: BTreeMap<i64, bool>,
    #[serde(default)]
    pub pages: BTreeMap<i64, bool>,
    #[serde(default)]
    pub operations: BTreeMap<i64, bool>,
}

/// Ids granted per level, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSet {
    pub module_ids: Vec<i64>,
    pub page_ids: Vec<i64>,
    pub operation_ids: Vec<i64>,
}

impl GrantSet {
    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty() && self.page_ids.is_empty() && self.operation_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.module_ids.len() + self.page_ids.len() + self.operation_ids.len()
    }

    /// Modules, then pages, then operations.
    pub fn targets(&self) -> impl Iterator<Item = PermissionTarget> + '_ {
        self.module_ids
            .iter()
            .map(|&id| PermissionTarget::Module(id))
            .chain(self.page_ids.iter().map(|&id| PermissionTarget::Page(id)))
            .chain(
                self.operation_ids
                    .iter()
                    .map(|&id| PermissionTarget::Operation(id)),
            )
    }
}

impl PermissionSelection {
    /// Seeds a selection from stored grants: each row checks its own node.
    pub fn from_permissions<'a>(permissions: impl IntoIterator<Item = &'a RolePermission>) -> Self {
        let mut selection = Self::default();
        for permission in permissions {
            if let Some(target) = permission.classify() {
                selection.set(target, true);
            }
        }
        selection
    }

    pub fn set(&mut self, target: PermissionTarget, checked: bool) {
        match target {
            PermissionTarget::Module(id) => self.modules.insert(id, checked),
            PermissionTarget::Page(id) => self.pages.insert(id, checked),
            PermissionTarget::Operation(id) => self.operations.insert(id, checked),
        };
    }

    /// Absent entries read as unchecked.
    pub fn is_checked(&self, target: PermissionTarget) -> bool {
        let map = match target {
            PermissionTarget::Module(_) => &self.modules,
            PermissionTarget::Page(_) => &self.pages,
            PermissionTarget::Operation(_) => &self.operations,
        };
        map.get(&target.id()).copied().unwrap_or(false)
    }

    pub fn is_module_checked(&self, id: i64) -> bool {
        self.is_checked(PermissionTarget::Module(id))
    }

    pub fn is_page_checked(&self, id: i64) -> bool {
        self.is_checked(PermissionTarget::Page(id))
    }

    pub fn is_operation_checked(&self, id: i64) -> bool {
        self.is_checked(PermissionTarget::Operation(id))
    }

    pub fn granted(&self) -> GrantSet {
        fn checked(map: &BTreeMap<i64, bool>) -> Vec<i64> {
            map.iter()
                .filter(|(_, &on)| on)
                .map(|(&id, _)| id)
                .collect()
        }

        GrantSet {
            module_ids: checked(&self.modules),
            page_ids: checked(&self.pages),
            operation_ids: checked(&self.operations),
        }
    }
}

/// One user action on the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionChange {
    Module { id: i64, checked: bool },
    Page { id: i64, checked: bool },
    Operation { id: i64, checked: bool },
    All { checked: bool },
}

/// A selection bound to the tree it is checked against.
#[derive(Debug, Clone)]
pub struct SelectionTree<'h> {
    hierarchy: &'h Hierarchy,
    selection: PermissionSelection,
}

impl<'h> SelectionTree<'h> {
    pub fn new(hierarchy: &'h Hierarchy, selection: PermissionSelection) -> Self {
        Self {
            hierarchy,
            selection,
        }
    }

    pub fn selection(&self) -> &PermissionSelection {
        &self.selection
    }

    pub fn into_selection(self) -> PermissionSelection {
        self.selection
    }

    pub fn apply(&mut self, change: SelectionChange) -> Result<()> {
        match change {
            SelectionChange::Module { id, checked } => self.set_module(id, checked),
            SelectionChange::Page { id, checked } => self.set_page(id, checked),
            SelectionChange::Operation { id, checked } => self.set_operation(id, checked),
            SelectionChange::All { checked } => {
                self.select_all(checked);
                Ok(())
            }
        }
    }

    /// Module and everything under it take `checked`.
    pub fn set_module(&mut self, id: i64, checked: bool) -> Result<()> {
        let hierarchy = self.hierarchy;
        let module = hierarchy
            .module(id)
            .ok_or_else(|| AppError::not_found(format!("Module {}", id)))?;

        self.selection.modules.insert(id, checked);
        for page in &module.pages {
            self.fill_page(page, checked);
        }
        Ok(())
    }

    /// Page and its operations take `checked`; the module is recomputed.
    pub fn set_page(&mut self, id: i64, checked: bool) -> Result<()> {
        let hierarchy = self.hierarchy;
        let (module, page) = hierarchy
            .page(id)
            .ok_or_else(|| AppError::not_found(format!("Page {}", id)))?;

        self.fill_page(page, checked);
        self.refresh_module(module);
        Ok(())
    }

    /// Operation takes `checked`; its page and module are recomputed.
    pub fn set_operation(&mut self, id: i64, checked: bool) -> Result<()> {
        let hierarchy = self.hierarchy;
        let (module, page, _) = hierarchy
            .operation(id)
            .ok_or_else(|| AppError::not_found(format!("Operation {}", id)))?;

        self.selection.operations.insert(id, checked);
        self.refresh_page(page);
        self.refresh_module(module);
        Ok(())
    }

    /// Every node in the tree takes `checked` in one step.
    pub fn select_all(&mut self, checked: bool) {
        let mut selection = PermissionSelection::default();
        for module in self.hierarchy.modules() {
            selection.modules.insert(module.module.id, checked);
            for page in &module.pages {
                selection.pages.insert(page.page.id, checked);
                for operation in &page.operations {
                    selection.operations.insert(operation.id, checked);
                }
            }
        }
        self.selection = selection;
    }

    /// True when every module is checked (vacuously true for an empty tree).
    pub fn is_all_selected(&self) -> bool {
        self.hierarchy
            .modules()
            .iter()
            .all(|m| self.selection.is_module_checked(m.module.id))
    }

    fn fill_page(&mut self, page: &PageNode, checked: bool) {
        self.selection.pages.insert(page.page.id, checked);
        for operation in &page.operations {
            self.selection.operations.insert(operation.id, checked);
        }
    }

    fn refresh_page(&mut self, page: &PageNode) {
        let all = page
            .operations
            .iter()
            .all(|o| self.selection.is_operation_checked(o.id));
        self.selection.pages.insert(page.page.id, all);
    }

    fn refresh_module(&mut self, module: &ModuleNode) {
        let all = module
            .pages
            .iter()
            .all(|p| self.selection.is_page_checked(p.page.id));
        self.selection.modules.insert(module.module.id, all);
    }
}
