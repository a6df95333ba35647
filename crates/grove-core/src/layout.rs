//! Radial network layout with progressive disclosure

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LayoutError;
use crate::model::{FileKind, FileNode, NodeId};
use crate::network::{Connection, ConnectionKind, Network, NetworkNode};
use crate::tree::FileTree;

pub const MAX_ENTRY_POINTS: usize = 5;
/// Children of the root shown next to it when no entry point is found.
const FALLBACK_CHILDREN: usize = 3;
const MAX_SIBLING_LINKS: usize = 2;

const OUTER_RING: f64 = 200.0;
const RING_STEP: f64 = 60.0;
const MIN_RING: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Viewport { width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(800.0, 600.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    /// Root and entry points first, directories reveal children on expansion.
    #[default]
    Progressive,
    /// Everything visible.
    Full,
}

/// Radius of the ring holding the children of a node at `level`.
pub fn ring_radius(level: u32) -> f64 {
    (OUTER_RING - level as f64 * RING_STEP).max(MIN_RING)
}

/// Fixed priority ladder used for node sizing and entry-point ranking.
pub fn importance(node: &FileNode) -> u8 {
    let name = node.name.to_lowercase();
    if name == "package.json" || name.starts_with("readme") {
        10
    } else if ["index", "main", "app"].iter().any(|hint| name.contains(hint)) {
        9
    } else if node.path.contains("/src/") && node.depth <= 3 {
        8
    } else if node.is_dir() && node.depth <= 2 {
        7
    } else if name.contains("config") || name.contains("types") {
        6
    } else {
        match node.extension.as_deref() {
            Some("ts") | Some("tsx") => 5,
            Some("js") | Some("jsx") => 4,
            _ => (5 - node.depth as i64).max(1) as u8,
        }
    }
}

fn is_entry_candidate(node: &FileNode) -> bool {
    let name = node.name.to_lowercase();
    name == "package.json"
        || name.starts_with("readme")
        || ["index", "main", "app"].iter().any(|hint| name.contains(hint))
        || (node.is_dir() && node.depth <= 1)
}

/// Up to [`MAX_ENTRY_POINTS`] nodes to show before anything is expanded.
///
/// Name heuristics and shallow directories qualify; candidates are ranked by
/// importance, keeping tree order among equals. Without any candidate the
/// root and its first few children are used.
pub fn select_entry_points(tree: &FileTree) -> Vec<NodeId> {
    let root = tree.root();
    let mut candidates: Vec<&FileNode> = tree
        .iter()
        .filter(|n| n.id != root && is_entry_candidate(n))
        .collect();

    if candidates.is_empty() {
        let mut fallback = vec![root];
        fallback.extend(tree.children(root).unwrap_or(&[]).iter().take(FALLBACK_CHILDREN));
        return fallback;
    }

    candidates.sort_by_key(|n| std::cmp::Reverse(importance(n)));
    candidates
        .into_iter()
        .take(MAX_ENTRY_POINTS)
        .map(|n| n.id)
        .collect()
}

/// Serializable view of the layout for renderers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub mode: VisibilityMode,
    pub viewport: Viewport,
    pub entry_points: Vec<NodeId>,
    pub nodes: Vec<NetworkNode>,
    pub connections: Vec<Connection>,
}

/// Positions and visibility state for every node of a tree snapshot.
#[derive(Debug)]
pub struct GraphLayout {
    network: Network,
    children: HashMap<NodeId, Vec<NodeId>>,
    root: NodeId,
    viewport: Viewport,
    mode: VisibilityMode,
    expanded: HashSet<NodeId>,
    /// Directories the user explicitly collapsed. Their entry-point
    /// children stay hidden until the directory is expanded again.
    collapsed: HashSet<NodeId>,
    entry_points: Vec<NodeId>,
}

impl GraphLayout {
    pub fn new(tree: &FileTree, viewport: Viewport, mode: VisibilityMode) -> Self {
        let mut layout = GraphLayout {
            network: Network::new(),
            children: HashMap::new(),
            root: tree.root(),
            viewport,
            mode,
            expanded: HashSet::new(),
            collapsed: HashSet::new(),
            entry_points: Vec::new(),
        };
        layout.rebuild(tree);
        layout
    }

    /// Re-derive everything from a new tree snapshot. Expansion state
    /// survives for directories that still exist.
    pub fn rebuild(&mut self, tree: &FileTree) {
        self.root = tree.root();
        self.entry_points = select_entry_points(tree);
        let entry_set: HashSet<NodeId> = self.entry_points.iter().copied().collect();

        self.network = Network::new();
        self.children.clear();
        for node in tree.iter() {
            self.network.add_node(NetworkNode {
                id: node.id,
                name: node.name.clone(),
                path: node.path.clone(),
                kind: node.kind,
                depth: node.depth,
                extension: node.extension.clone(),
                size: node.size,
                x: 0.0,
                y: 0.0,
                connections: Vec::new(),
                level: node.depth,
                visible: false,
                expanded: false,
                importance: importance(node),
                parent_id: node.parent,
                is_entry_point: entry_set.contains(&node.id),
            });
            if let Some(children) = &node.children {
                self.children.insert(node.id, children.clone());
            }
        }

        for node in tree.iter() {
            let Some(parent) = node.parent else { continue };
            self.network
                .connect(Connection::new(parent, node.id, ConnectionKind::ParentChild));

            let siblings = tree.children(parent).unwrap_or(&[]);
            for &sibling in siblings.iter().filter(|&&s| s != node.id).take(MAX_SIBLING_LINKS) {
                self.network
                    .connect(Connection::new(node.id, sibling, ConnectionKind::Sibling));
            }
        }

        let network = &self.network;
        let is_dir = |id: &NodeId| network.node(*id).is_some_and(|n| n.kind == FileKind::Directory);
        self.expanded.retain(is_dir);
        self.collapsed.retain(is_dir);

        self.position_nodes();
        self.apply_visibility();
        debug!(
            "Layout rebuilt: {} nodes, {} connections, {} entry points",
            self.network.node_count(),
            self.network.connection_count(),
            self.entry_points.len()
        );
    }

    /// New viewport dimensions: every position is recomputed.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.position_nodes();
    }

    /// Switch visibility policy. Expansion state is cleared, positions kept.
    pub fn set_mode(&mut self, mode: VisibilityMode) {
        self.mode = mode;
        self.expanded.clear();
        self.collapsed.clear();
        self.apply_visibility();
    }

    /// Toggle a directory. In progressive mode its direct children follow
    /// the new expansion state. Returns whether the node is now expanded.
    pub fn toggle_expansion(&mut self, id: NodeId) -> Result<bool, LayoutError> {
        let node = self.network.node(id).ok_or(LayoutError::UnknownNode(id))?;
        if node.kind != FileKind::Directory {
            return Err(LayoutError::NotADirectory(id));
        }

        let expanded = if self.expanded.remove(&id) {
            self.collapsed.insert(id);
            false
        } else {
            self.collapsed.remove(&id);
            self.expanded.insert(id);
            true
        };
        self.apply_visibility();
        Ok(expanded)
    }

    pub fn node(&self, id: NodeId) -> Option<&NetworkNode> {
        self.network.node(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.network.nodes()
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.network.nodes().filter(|n| n.visible)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.network.connections()
    }

    /// Edges with both endpoints visible, derived on every call.
    pub fn visible_connections(&self) -> Vec<&Connection> {
        self.network.visible_connections()
    }

    pub fn entry_points(&self) -> &[NodeId] {
        &self.entry_points
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn mode(&self) -> VisibilityMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Visible nodes and edges, ready to serialize.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            mode: self.mode,
            viewport: self.viewport,
            entry_points: self.entry_points.clone(),
            nodes: self.visible_nodes().cloned().collect(),
            connections: self.visible_connections().into_iter().cloned().collect(),
        }
    }

    fn position_nodes(&mut self) {
        let (cx, cy) = self.viewport.center();
        let root = self.root;
        if let Some(node) = self.network.node_mut(root) {
            node.x = cx;
            node.y = cy;
        }
        self.place_children(root, 0.0);
    }

    /// Fan the children of `parent` around the parent's angle on the ring for
    /// the parent's level, then recurse with each child's own angle.
    fn place_children(&mut self, parent: NodeId, parent_angle: f64) {
        let Some(children) = self.children.get(&parent).cloned() else {
            return;
        };
        if children.is_empty() {
            return;
        }
        let Some(level) = self.network.node(parent).map(|n| n.level) else {
            return;
        };

        let (cx, cy) = self.viewport.center();
        let count = children.len() as f64;
        let step = TAU / count;
        let radius = ring_radius(level);

        for (i, child) in children.into_iter().enumerate() {
            let angle = parent_angle + (i as f64 - (count - 1.0) / 2.0) * step;
            if let Some(node) = self.network.node_mut(child) {
                node.x = cx + radius * angle.cos();
                node.y = cy + radius * angle.sin();
            }
            self.place_children(child, angle);
        }
    }

    fn apply_visibility(&mut self) {
        let full = self.mode == VisibilityMode::Full;
        let root = self.root;
        let expanded = &self.expanded;
        let collapsed = &self.collapsed;
        self.network.for_each_node_mut(|node| {
            node.expanded = expanded.contains(&node.id);
            node.visible = full
                || node.id == root
                || node.parent_id.is_some_and(|p| expanded.contains(&p))
                || (node.is_entry_point && !node.parent_id.is_some_and(|p| collapsed.contains(&p)));
        });
    }
}
