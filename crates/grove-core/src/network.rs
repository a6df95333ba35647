//! Network graph of laid-out nodes, backed by petgraph::StableDiGraph

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};

use crate::model::{FileKind, NodeId};

/// A tree node as placed in the network view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u64>,
    pub x: f64,
    pub y: f64,
    /// Ids of every node this one shares a connection with.
    pub connections: Vec<NodeId>,
    pub level: u32,
    pub visible: bool,
    pub expanded: bool,
    pub importance: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<NodeId>,
    pub is_entry_point: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionKind {
    #[serde(rename = "parent-child")]
    ParentChild,
    #[serde(rename = "sibling")]
    Sibling,
}

impl ConnectionKind {
    pub fn strength(self) -> f32 {
        match self {
            ConnectionKind::ParentChild => 1.0,
            ConnectionKind::Sibling => 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    pub strength: f32,
}

impl Connection {
    pub fn new(source: NodeId, target: NodeId, kind: ConnectionKind) -> Self {
        Connection {
            source,
            target,
            kind,
            strength: kind.strength(),
        }
    }
}

/// Directed graph of [`NetworkNode`]s addressed by their tree [`NodeId`].
pub struct Network {
    inner: StableDiGraph<NetworkNode, Connection>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Network {
    pub fn new() -> Self {
        Network {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add a node, replacing nothing: a second node with the same id is ignored.
    pub fn add_node(&mut self, node: NetworkNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        let id = node.id;
        let idx = self.inner.add_node(node);
        self.index.insert(id, idx);
        true
    }

    /// Add a connection unless an endpoint is missing or the pair is already
    /// connected in either direction.
    pub fn connect(&mut self, connection: Connection) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&connection.source), self.index.get(&connection.target)) else {
            return false;
        };
        if a == b || self.inner.find_edge_undirected(a, b).is_some() {
            return false;
        }
        let (source, target) = (connection.source, connection.target);
        self.inner.add_edge(a, b, connection);
        if let Some(node) = self.inner.node_weight_mut(a) {
            node.connections.push(target);
        }
        if let Some(node) = self.inner.node_weight_mut(b) {
            node.connections.push(source);
        }
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&NetworkNode> {
        self.index.get(&id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NetworkNode> {
        let idx = *self.index.get(&id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    pub fn for_each_node_mut(&mut self, mut f: impl FnMut(&mut NetworkNode)) {
        let indices: Vec<NodeIndex> = self.inner.node_indices().collect();
        for idx in indices {
            if let Some(node) = self.inner.node_weight_mut(idx) {
                f(node);
            }
        }
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    /// Connections whose two endpoints are both visible.
    pub fn visible_connections(&self) -> Vec<&Connection> {
        self.connections()
            .filter(|c| self.is_visible(c.source) && self.is_visible(c.target))
            .collect()
    }

    fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.visible)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32) -> NetworkNode {
        NetworkNode {
            id: NodeId(id),
            name: format!("n{id}"),
            path: format!("n{id}"),
            kind: FileKind::File,
            depth: 1,
            extension: None,
            size: None,
            x: 0.0,
            y: 0.0,
            connections: Vec::new(),
            level: 1,
            visible: false,
            expanded: false,
            importance: 1,
            parent_id: None,
            is_entry_point: false,
        }
    }

    #[test]
    fn test_connect_dedupes_pairs() {
        let mut network = Network::new();
        network.add_node(node(1));
        network.add_node(node(2));

        assert!(network.connect(Connection::new(NodeId(1), NodeId(2), ConnectionKind::Sibling)));
        assert!(!network.connect(Connection::new(NodeId(2), NodeId(1), ConnectionKind::Sibling)));
        assert!(!network.connect(Connection::new(NodeId(1), NodeId(9), ConnectionKind::Sibling)));
        assert_eq!(network.connection_count(), 1);
        assert_eq!(network.node(NodeId(1)).unwrap().connections, vec![NodeId(2)]);
        assert_eq!(network.node(NodeId(2)).unwrap().connections, vec![NodeId(1)]);
    }

    #[test]
    fn test_visible_connections_require_both_ends() {
        let mut network = Network::new();
        for id in 1..=3 {
            network.add_node(node(id));
        }
        network.connect(Connection::new(NodeId(1), NodeId(2), ConnectionKind::ParentChild));
        network.connect(Connection::new(NodeId(1), NodeId(3), ConnectionKind::ParentChild));
        assert!(network.visible_connections().is_empty());

        network.node_mut(NodeId(1)).unwrap().visible = true;
        network.node_mut(NodeId(2)).unwrap().visible = true;
        let visible = network.visible_connections();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].target, NodeId(2));
        assert_eq!(visible[0].strength, 1.0);
    }
}
