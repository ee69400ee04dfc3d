use std::collections::HashMap;
use tracing::debug;

use crate::data::{coerce_or_zero, QueryResult};
use crate::ir::{HierarchyData, HierarchyNode, ResolvedHierarchyConfig, Slice};
use crate::resolve::resolve_column;

const ROOT_NAME: &str = "root";

#[derive(Debug)]
struct ArenaNode {
    name: String,
    value: Option<f64>,
    children: Vec<usize>,
}

/// Tree under construction. Nodes are addressed by (parent index, name), which
/// identifies a full hierarchy path without rescanning sibling lists.
#[derive(Debug)]
struct Arena {
    nodes: Vec<ArenaNode>,
    by_path: HashMap<(usize, String), usize>,
}

impl Arena {
    fn new() -> Self {
        Self {
            nodes: vec![ArenaNode {
                name: ROOT_NAME.to_string(),
                value: None,
                children: Vec::new(),
            }],
            by_path: HashMap::new(),
        }
    }

    fn child(&mut self, parent: usize, name: String) -> usize {
        if let Some(&idx) = self.by_path.get(&(parent, name.clone())) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(ArenaNode {
            name: name.clone(),
            value: None,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        self.by_path.insert((parent, name), idx);
        idx
    }

    fn accumulate(&mut self, idx: usize, value: f64) {
        let node = &mut self.nodes[idx];
        node.value = Some(node.value.unwrap_or(0.0) + value);
    }

    fn into_tree(self) -> HierarchyNode {
        let mut slots: Vec<Option<ArenaNode>> = self.nodes.into_iter().map(Some).collect();
        take_node(&mut slots, 0)
    }
}

fn take_node(slots: &mut [Option<ArenaNode>], idx: usize) -> HierarchyNode {
    let Some(node) = slots[idx].take() else {
        return HierarchyNode {
            name: String::new(),
            value: None,
            children: Vec::new(),
        };
    };
    HierarchyNode {
        name: node.name,
        value: node.value,
        children: node
            .children
            .into_iter()
            .map(|child| take_node(slots, child))
            .collect(),
    }
}

/// Fold rows into a tree keyed by the hierarchy columns (outermost first).
///
/// Only the deepest level carries values; rows that share a full path are
/// summed into the same leaf. Internal nodes stay valueless so consumers can
/// aggregate without double counting (see [`HierarchyNode::total`]).
pub fn build_tree(
    result: &QueryResult,
    hierarchy: &[Option<usize>],
    value_idx: Option<usize>,
    placeholder: &str,
) -> HierarchyNode {
    let mut arena = Arena::new();

    for row in 0..result.rows.len() {
        let mut node = 0;
        for &col in hierarchy {
            let name = result
                .cell(row, col)
                .label()
                .unwrap_or_else(|| placeholder.to_string());
            node = arena.child(node, name);
        }
        if node != 0 {
            arena.accumulate(node, coerce_or_zero(result.cell(row, value_idx)));
        }
    }

    let nodes = arena.nodes.len();
    let tree = arena.into_tree();
    debug!(nodes, total = tree.total(), "built hierarchy");
    tree
}

/// One (label, value) slice per row, used when no hierarchy is configured.
pub fn build_flat(
    result: &QueryResult,
    label_idx: Option<usize>,
    value_idx: Option<usize>,
    placeholder: &str,
) -> Vec<Slice> {
    (0..result.rows.len())
        .map(|row| Slice {
            label: result
                .cell(row, label_idx)
                .label()
                .unwrap_or_else(|| placeholder.to_string()),
            value: coerce_or_zero(result.cell(row, value_idx)),
        })
        .collect()
}

/// Treemap/sunburst entry point.
pub fn build_hierarchy(result: &QueryResult, config: &ResolvedHierarchyConfig) -> HierarchyData {
    if config.hierarchy_columns.is_empty() {
        let label_idx = resolve_column(result, config.label_column.as_deref(), 0);
        let value_idx = resolve_column(result, config.value_column.as_deref(), 1);
        return HierarchyData::Flat(build_flat(result, label_idx, value_idx, &config.placeholder));
    }

    let hierarchy: Vec<Option<usize>> = config
        .hierarchy_columns
        .iter()
        .map(|name| resolve_column(result, Some(name), 0))
        .collect();
    // Values default to the last column
    let last = result.columns.len().saturating_sub(1);
    let value_idx = resolve_column(result, config.value_column.as_deref(), last);

    HierarchyData::Tree(build_tree(result, &hierarchy, value_idx, &config.placeholder))
}
