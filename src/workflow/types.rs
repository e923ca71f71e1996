//! Core graph type definitions
//!
//! Graph definitions, nodes, edge specifications and the state bag threaded
//! through a run. These types are deserialized straight from API requests and
//! serialized back when a stored graph is queried.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Mutable key-value data shared by every step of a run
pub type StateBag = Map<String, Value>;

/// Opaque node configuration handed to the step function as-is
pub type Params = Map<String, Value>;

/// A stored graph definition
///
/// Built once from a [`GraphCreateRequest`] (or a sample builder) and then only
/// ever shared behind an `Arc`; nothing mutates a published graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDefinition {
    /// Opaque graph identifier (UUID v4)
    pub graph_id: String,
    /// Nodes in submission order, one per unique name
    pub nodes: Vec<NodeDefinition>,
    /// Outgoing edge specification per node name; a missing entry marks a terminal node
    pub edges: HashMap<String, EdgeSpec>,
    /// Name of the node every run starts from
    pub start_node: String,
    /// Lookup from node name to its position in `nodes`
    #[serde(skip)]
    node_index: HashMap<String, usize>,
}

impl GraphDefinition {
    /// Assemble a graph, keeping node names unique
    ///
    /// A repeated name replaces the earlier definition but keeps its position.
    pub fn new(
        graph_id: String,
        nodes: Vec<NodeDefinition>,
        edges: HashMap<String, EdgeSpec>,
        start_node: String,
    ) -> Self {
        let mut unique: Vec<NodeDefinition> = Vec::with_capacity(nodes.len());
        let mut node_index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            match node_index.get(&node.name) {
                Some(&position) => {
                    tracing::warn!("⚠️ Duplicate node '{}' in graph {}; later definition wins", node.name, graph_id);
                    unique[position] = node;
                }
                None => {
                    node_index.insert(node.name.clone(), unique.len());
                    unique.push(node);
                }
            }
        }

        Self {
            graph_id,
            nodes: unique,
            edges,
            start_node,
            node_index,
        }
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.node_index.get(name).map(|&position| &self.nodes[position])
    }

    /// Outgoing edge specification of a node, `None` when the node is terminal
    pub fn edge(&self, name: &str) -> Option<&EdgeSpec> {
        self.edges.get(name)
    }
}

/// A single named step of a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Node name, unique within its graph
    pub name: String,
    /// Registered step function to call; `None` makes the node a passthrough
    #[serde(default)]
    pub func: Option<String>,
    /// Parameters passed to the step function (null and absent both mean empty)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub params: Params,
}

impl NodeDefinition {
    /// Node bound to a step function with no parameters
    pub fn step(name: impl Into<String>, func: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            func: Some(func.into()),
            params: Params::new(),
        }
    }

    /// Node without a step function
    pub fn passthrough(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            func: None,
            params: Params::new(),
        }
    }

    /// Attach parameters to the node
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Outgoing transition specification of one node
///
/// Accepts either a bare node name or an ordered rule list. Anything else is
/// stored as-is and fails the run that reaches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeSpec {
    /// Unconditional transition to the named node
    Next(String),
    /// Ordered rules, first match wins
    Rules(Vec<EdgeRule>),
    /// Neither of the above
    Malformed(Value),
}

/// One rule of a conditional edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRule {
    /// Predicate guarding the rule; `None` makes it the catch-all
    #[serde(default)]
    pub cond: Option<Condition>,
    /// Target node; `None` halts the run when this rule wins
    #[serde(default)]
    pub next: Option<String>,
}

impl EdgeRule {
    /// Rule taken when `cond` holds
    pub fn when(cond: Condition, next: Option<&str>) -> Self {
        Self {
            cond: Some(cond),
            next: next.map(str::to_string),
        }
    }

    /// Catch-all rule
    pub fn otherwise(next: Option<&str>) -> Self {
        Self {
            cond: None,
            next: next.map(str::to_string),
        }
    }
}

/// Single comparison between a state value and a literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// State key to read
    pub key: String,
    /// Comparison operator
    pub op: Operator,
    /// Literal to compare against
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(key: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            key: key.into(),
            op,
            value,
        }
    }
}

/// Comparison operators understood by the condition evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Neq,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = ">=")]
    Ge,
    #[serde(alias = "<=")]
    Le,
    /// Any operator string not listed above; always evaluates to false
    #[serde(other)]
    Unknown,
}

/// Request body for graph creation
#[derive(Debug, Clone, Deserialize)]
pub struct GraphCreateRequest {
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: HashMap<String, EdgeSpec>,
    pub start_node: String,
}

impl GraphCreateRequest {
    /// Normalize the request into a graph definition under the given identifier
    ///
    /// A `null` edge entry is the same as no entry: the node is terminal.
    pub fn into_definition(mut self, graph_id: String) -> GraphDefinition {
        self.edges
            .retain(|_, spec| !matches!(spec, EdgeSpec::Malformed(Value::Null)));
        GraphDefinition::new(graph_id, self.nodes, self.edges, self.start_node)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Params, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Params>::deserialize(deserializer)?.unwrap_or_default())
}
