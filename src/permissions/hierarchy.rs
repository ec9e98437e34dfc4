//! Module → Page → Operation tree.

use crate::models::{Module, Operation, Page};
use serde::Serialize;
use std::collections::HashMap;

/// A page with its operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageNode {
    #[serde(flatten)]
    pub page: Page,
    pub operations: Vec<Operation>,
}

/// A module with its pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleNode {
    #[serde(flatten)]
    pub module: Module,
    pub pages: Vec<PageNode>,
}

/// The full permission tree plus id lookups.
///
/// Serializes as the bare list of modules.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Hierarchy {
    modules: Vec<ModuleNode>,
    #[serde(skip)]
    module_index: HashMap<i64, usize>,
    #[serde(skip)]
    page_index: HashMap<i64, (usize, usize)>,
    #[serde(skip)]
    operation_index: HashMap<i64, (usize, usize, usize)>,
}

/// Nests pages under modules and operations under pages.
///
/// Input order is kept at every level. Pages whose module is missing and
/// operations whose page is missing are dropped.
pub fn build_hierarchy(
    modules: Vec<Module>,
    pages: Vec<Page>,
    operations: Vec<Operation>,
) -> Hierarchy {
    let mut operations_by_page: HashMap<i64, Vec<Operation>> = HashMap::new();
    for operation in operations {
        operations_by_page
            .entry(operation.page_id)
            .or_default()
            .push(operation);
    }

    let mut pages_by_module: HashMap<i64, Vec<PageNode>> = HashMap::new();
    for page in pages {
        let operations = operations_by_page.get(&page.id).cloned().unwrap_or_default();
        pages_by_module
            .entry(page.module_id)
            .or_default()
            .push(PageNode { page, operations });
    }

    let nodes = modules
        .into_iter()
        .map(|module| {
            let pages = pages_by_module.get(&module.id).cloned().unwrap_or_default();
            ModuleNode { module, pages }
        })
        .collect();

    Hierarchy::from_nodes(nodes)
}

impl Hierarchy {
    fn from_nodes(modules: Vec<ModuleNode>) -> Self {
        let mut module_index = HashMap::new();
        let mut page_index = HashMap::new();
        let mut operation_index = HashMap::new();

        // first occurrence wins when ids repeat
        for (mi, module) in modules.iter().enumerate() {
            module_index.entry(module.module.id).or_insert(mi);
            for (pi, page) in module.pages.iter().enumerate() {
                page_index.entry(page.page.id).or_insert((mi, pi));
                for (oi, operation) in page.operations.iter().enumerate() {
                    operation_index.entry(operation.id).or_insert((mi, pi, oi));
                }
            }
        }

        Self {
            modules,
            module_index,
            page_index,
            operation_index,
        }
    }

    pub fn modules(&self) -> &[ModuleNode] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, id: i64) -> Option<&ModuleNode> {
        self.module_index.get(&id).map(|&mi| &self.modules[mi])
    }

    /// Page and the module that owns it.
    pub fn page(&self, id: i64) -> Option<(&ModuleNode, &PageNode)> {
        self.page_index.get(&id).map(|&(mi, pi)| {
            let module = &self.modules[mi];
            (module, &module.pages[pi])
        })
    }

    /// Operation with its page and module.
    pub fn operation(&self, id: i64) -> Option<(&ModuleNode, &PageNode, &Operation)> {
        self.operation_index.get(&id).map(|&(mi, pi, oi)| {
            let module = &self.modules[mi];
            let page = &module.pages[pi];
            (module, page, &page.operations[oi])
        })
    }

    pub fn page_count(&self) -> usize {
        self.modules.iter().map(|m| m.pages.len()).sum()
    }

    pub fn operation_count(&self) -> usize {
        self.modules
            .iter()
            .flat_map(|m| m.pages.iter())
            .map(|p| p.operations.len())
            .sum()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn module(id: i64, name: &str) -> Module {
        Module {
            id,
            name: name.to_string(),
            code: format!("M-{id}"),
            application_type: 0,
        }
    }

    pub fn page(id: i64, module_id: i64) -> Page {
        Page {
            id,
            module_id,
            name: format!("Page {id}"),
            code: format!("P-{id}"),
            url: None,
        }
    }

    pub fn operation(id: i64, page_id: i64) -> Operation {
        Operation {
            id,
            page_id,
            code: format!("O-{id}"),
            name: format!("Operation {id}"),
        }
    }

    /// Modules 1 and 5. Module 5 owns pages 15 and 17, page 15 owns
    /// operations 57 and 58. Module 1 owns page 2 with operations 1 and 2.
    pub fn warehouse() -> Hierarchy {
        build_hierarchy(
            vec![module(1, "Activity"), module(5, "Warehouse")],
            vec![page(2, 1), page(15, 5), page(17, 5)],
            vec![operation(1, 2), operation(2, 2), operation(57, 15), operation(58, 15)],
        )
    }
}
