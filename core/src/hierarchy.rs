//! Segmentation hierarchy for the treemap.
//!
//! SHAPE:
//!   All Customers
//!     └─ live status            (Live / Not Live)
//!          └─ status group      (only when a live/status pair has 2+ rows)
//!               └─ category     (one leaf per SegmentRow)
//!
//! A live/status pair with a single row hangs that row's category leaf
//! directly under the live-status node. Every internal node's count and
//! ACV are the sums of its children; siblings are ordered by descending ACV,
//! ties in input order.
//!
//! Nodes are linked by scoped ids (`root`, `live/<name>`, `group/<name>`,
//! `cat/<category>`), so a category may share its display name with a
//! structural node.

use crate::{
    config::LabelPolicy,
    dataset::{AccountStatus, Column, LiveStatus, SegmentRow},
    error::{ReportError, ReportResult},
    format,
    types::{AcvMillions, Count},
    views::{rank_descending, Ranked},
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const ROOT_NAME: &str = "All Customers";
pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub label: String,
    pub count: Count,
    pub acv_millions: AcvMillions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn leaves(&self) -> Vec<&TreeNode> {
        if self.is_leaf() {
            return vec![self];
        }
        self.children.iter().flat_map(|c| c.leaves()).collect()
    }

    /// Depth-first search by display name; the first match wins.
    pub fn find(&self, name: &str) -> Option<&TreeNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_id(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_id(id))
    }

    /// Pre-order list of `(id, parent)` entries, the parallel-array shape
    /// treemap renderers take.
    pub fn flatten(&self) -> Vec<FlatNode> {
        let mut out = Vec::new();
        self.flatten_into(None, &mut out);
        out
    }

    fn flatten_into(&self, parent: Option<&str>, out: &mut Vec<FlatNode>) {
        out.push(FlatNode {
            id: self.id.clone(),
            name: self.name.clone(),
            parent: parent.map(str::to_string),
            label: self.label.clone(),
            count: self.count,
            acv_millions: self.acv_millions,
        });
        for child in &self.children {
            child.flatten_into(Some(&self.id), out);
        }
    }
}

impl Ranked for TreeNode {
    fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::Count => Some(self.count as f64),
            Column::Metric => Some(self.acv_millions),
            Column::Secondary => None,
        }
    }
}

/// One node of a flat parent-reference list. Ids must be unique and
/// `parent` refers to an id; names are display-only. When linked, values of
/// internal nodes are recomputed from their children; only leaf values are
/// taken as given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatNode {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
    pub label: String,
    pub count: Count,
    pub acv_millions: AcvMillions,
}

impl FlatNode {
    pub fn branch(id: &str, name: &str, parent: Option<&str>) -> Self {
        Self::leaf(id, name, parent, 0, 0.0)
    }

    pub fn leaf(
        id: &str,
        name: &str,
        parent: Option<&str>,
        count: Count,
        acv_millions: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: parent.map(str::to_string),
            label: String::new(),
            count,
            acv_millions,
        }
    }
}

/// Link a flat parent-reference list into a tree.
///
/// Fails if an id repeats, if there is not exactly one root, if a parent
/// reference names no node, or if some node cannot be reached from the root.
pub fn link_hierarchy(nodes: &[FlatNode], policy: &LabelPolicy) -> ReportResult<TreeNode> {
    let mut ids = HashSet::new();
    for node in nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(ReportError::hierarchy(format!(
                "node id '{}' is not unique",
                node.id
            )));
        }
    }

    let roots: Vec<usize> = (0..nodes.len())
        .filter(|&i| nodes[i].parent.is_none())
        .collect();
    let root = match roots.as_slice() {
        [only] => *only,
        [] => return Err(ReportError::hierarchy("no root node")),
        _ => {
            return Err(ReportError::hierarchy(format!(
                "{} root nodes, expected one",
                roots.len()
            )))
        }
    };

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.parent.as_deref() {
            if !ids.contains(parent) {
                return Err(ReportError::hierarchy(format!(
                    "parent '{parent}' of '{}' cannot be resolved",
                    node.id
                )));
            }
            children.entry(parent).or_default().push(i);
        }
    }

    let mut visited = 0usize;
    let tree = build_node(nodes, root, &children, policy, &mut visited);
    if visited != nodes.len() {
        return Err(ReportError::hierarchy(format!(
            "{} node(s) unreachable from '{}'",
            nodes.len() - visited,
            nodes[root].id
        )));
    }
    Ok(tree)
}

fn build_node(
    nodes: &[FlatNode],
    idx: usize,
    children: &HashMap<&str, Vec<usize>>,
    policy: &LabelPolicy,
    visited: &mut usize,
) -> TreeNode {
    *visited += 1;
    let flat = &nodes[idx];

    let kids: Vec<TreeNode> = children
        .get(flat.id.as_str())
        .map(|ids| {
            let built: Vec<TreeNode> = ids
                .iter()
                .map(|&c| build_node(nodes, c, children, policy, visited))
                .collect();
            // Stable: equal ACV keeps input order.
            rank_descending(&built, Column::Metric)
        })
        .unwrap_or_default();

    let (count, acv_millions) = if kids.is_empty() {
        (flat.count, flat.acv_millions)
    } else {
        (
            kids.iter().map(|k| k.count).sum(),
            kids.iter().map(|k| k.acv_millions).sum(),
        )
    };

    TreeNode {
        id: flat.id.clone(),
        name: flat.name.clone(),
        label: format::count_and_acv(&flat.name, count, acv_millions, policy),
        count,
        acv_millions,
        children: kids,
    }
}

fn live_id(live: LiveStatus) -> String {
    format!("live/{}", live.name())
}

fn group_name(live: LiveStatus, status: AccountStatus) -> String {
    format!("{}-{}", live.name(), status.name())
}

/// Rebuild the All → live status → status/category tree from flat rows.
pub fn build_segmentation_hierarchy(
    segments: &[SegmentRow],
    policy: &LabelPolicy,
) -> ReportResult<TreeNode> {
    // First-appearance order of live statuses and of their status groups.
    let mut lives: Vec<LiveStatus> = Vec::new();
    let mut groups: Vec<((LiveStatus, AccountStatus), Vec<&SegmentRow>)> = Vec::new();
    for row in segments {
        if !lives.contains(&row.live_status) {
            lives.push(row.live_status);
        }
        let key = (row.live_status, row.status);
        match groups.iter().position(|(k, _)| *k == key) {
            Some(i) => groups[i].1.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    let mut nodes = vec![FlatNode::branch(ROOT_ID, ROOT_NAME, None)];
    for live in &lives {
        nodes.push(FlatNode::branch(
            &live_id(*live),
            live.name(),
            Some(ROOT_ID),
        ));
    }
    for ((live, status), rows) in &groups {
        let parent = if rows.len() > 1 {
            let name = group_name(*live, *status);
            let id = format!("group/{name}");
            nodes.push(FlatNode::branch(&id, &name, Some(&live_id(*live))));
            id
        } else {
            live_id(*live)
        };
        for row in rows {
            nodes.push(FlatNode::leaf(
                &format!("cat/{}", row.category),
                &row.category,
                Some(parent.as_str()),
                row.count,
                row.acv_millions,
            ));
        }
    }

    // Duplicate categories surface here as a repeated `cat/` id.
    let tree = link_hierarchy(&nodes, policy)?;
    log::debug!(
        "hierarchy: {} segments -> {} nodes, root ACV {:.2}",
        segments.len(),
        nodes.len(),
        tree.acv_millions
    );
    Ok(tree)
}
