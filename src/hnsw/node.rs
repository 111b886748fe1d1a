//! Graph node adjacency
//!
//! Nodes are addressed by dense slot indices into the index's parallel
//! arrays; adjacency lists hold neighbor slots, never owning references, so
//! the mutable graph has no cyclic-ownership problem.

/// Per-node adjacency lists, one per layer the node participates in.
/// `layers[0]` is the base layer (all nodes); higher layers are the sparse
/// express lanes.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub layers: Vec<Vec<usize>>,
}

impl Node {
    /// Create a node living on layers `0..=level` with empty adjacency.
    pub fn new(level: usize) -> Self {
        Self {
            layers: vec![Vec::new(); level + 1],
        }
    }

    /// Highest layer this node participates in.
    pub fn level(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Neighbor slots at `layer` (empty above the node's level).
    pub fn neighbors(&self, layer: usize) -> &[usize] {
        self.layers.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add an edge to `neighbor` at `layer`, ignoring duplicates.
    pub fn add_neighbor(&mut self, layer: usize, neighbor: usize) {
        if let Some(neighbors) = self.layers.get_mut(layer) {
            if !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }
    }

    /// Replace the adjacency list at `layer`.
    pub fn set_neighbors(&mut self, layer: usize, neighbors: Vec<usize>) {
        if let Some(slot) = self.layers.get_mut(layer) {
            *slot = neighbors;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_spans_levels() {
        let node = Node::new(3);
        assert_eq!(node.layers.len(), 4);
        assert_eq!(node.level(), 3);
        assert!(node.neighbors(0).is_empty());
        assert!(node.neighbors(9).is_empty());
    }

    #[test]
    fn test_add_neighbor_per_layer() {
        let mut node = Node::new(2);
        node.add_neighbor(0, 1);
        node.add_neighbor(0, 2);
        node.add_neighbor(1, 3);

        assert_eq!(node.neighbors(0), &[1, 2]);
        assert_eq!(node.neighbors(1), &[3]);
        assert_eq!(node.neighbors(2), &[] as &[usize]);
    }

    #[test]
    fn test_add_neighbor_deduplicates() {
        let mut node = Node::new(0);
        node.add_neighbor(0, 5);
        node.add_neighbor(0, 5);
        assert_eq!(node.neighbors(0), &[5]);
    }

    #[test]
    fn test_set_neighbors_replaces() {
        let mut node = Node::new(1);
        node.add_neighbor(0, 1);
        node.add_neighbor(0, 2);
        node.set_neighbors(0, vec![7]);
        assert_eq!(node.neighbors(0), &[7]);
        assert_eq!(node.neighbors(1), &[] as &[usize]);
    }
}
