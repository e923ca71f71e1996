//! Graph repository using ArcSwap
//!
//! Graphs are published fully built behind an `Arc` and never mutated, so
//! readers take a lock-free snapshot of the map while writers swap in a new one.

use crate::workflow::types::{GraphCreateRequest, GraphDefinition};
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Lock-free store of graph definitions keyed by graph identifier
///
/// Writers go through `rcu`, so concurrent submissions never lose each other's
/// entries; readers never block.
#[derive(Debug)]
pub struct GraphRepository {
    /// Key: graph_id, Value: immutable graph definition
    graphs: ArcSwap<HashMap<String, Arc<GraphDefinition>>>,
}

impl Default for GraphRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            graphs: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Allocate a fresh opaque graph identifier
    pub fn new_graph_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Normalize a creation request and publish it under a new identifier
    pub fn create(&self, request: GraphCreateRequest) -> String {
        let graph_id = Self::new_graph_id();
        self.insert(request.into_definition(graph_id.clone()));
        graph_id
    }

    /// Publish an already built graph under its own identifier
    pub fn insert(&self, graph: GraphDefinition) -> Arc<GraphDefinition> {
        let graph = Arc::new(graph);

        if graph.node(&graph.start_node).is_none() {
            tracing::warn!("⚠️ Graph {} starts at undefined node '{}'", graph.graph_id, graph.start_node);
        }

        self.graphs.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(graph.graph_id.clone(), Arc::clone(&graph));
            next
        });

        tracing::info!("📊 Stored graph {} with {} nodes", graph.graph_id, graph.nodes.len());
        graph
    }

    /// Get a graph by identifier (lock-free read)
    pub fn get(&self, graph_id: &str) -> Option<Arc<GraphDefinition>> {
        self.graphs.load().get(graph_id).cloned()
    }

    /// Remove a graph; runs already holding it keep their copy
    pub fn remove(&self, graph_id: &str) -> bool {
        let mut removed = false;
        self.graphs.rcu(|current| {
            let mut next = (**current).clone();
            removed = next.remove(graph_id).is_some();
            next
        });

        if removed {
            tracing::info!("Removed graph from repository: {}", graph_id);
        }
        removed
    }

    /// List stored graph identifiers
    pub fn list_ids(&self) -> Vec<String> {
        self.graphs.load().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.graphs.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> GraphCreateRequest {
        serde_json::from_value(json!({
            "nodes": [{"name": "a", "func": "noop"}, {"name": "b"}],
            "edges": {"a": "b", "b": null},
            "start_node": "a"
        }))
        .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let repo = GraphRepository::new();
        let id = repo.create(request());

        let graph = repo.get(&id).unwrap();
        assert_eq!(graph.graph_id, id);
        assert_eq!(graph.start_node, "a");
        assert!(graph.edge("a").is_some());
        assert!(graph.edge("b").is_none());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let repo = GraphRepository::new();
        let first = repo.create(request());
        let second = repo.create(request());

        assert_ne!(first, second);
        let mut ids = repo.list_ids();
        ids.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_remove() {
        let repo = GraphRepository::new();
        let id = repo.create(request());
        let held = repo.get(&id).unwrap();

        assert!(repo.remove(&id));
        assert!(!repo.remove(&id));
        assert!(repo.get(&id).is_none());
        assert!(repo.is_empty());
        assert_eq!(held.nodes.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_are_not_lost() {
        let repo = Arc::new(GraphRepository::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        repo.create(request());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(repo.len(), 200);
    }
}
