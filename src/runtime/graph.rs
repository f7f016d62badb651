//! The term graph.
//!
//! Instantiating a term turns it into graph nodes against an environment.
//! Nodes are small state machines; all movement between states happens in
//! the scheduler. A `let` never gets a node of its own: its bound term and
//! body are instantiated in a fresh child environment and the body node
//! stands for the whole expression. Sharing follows from that shape: every
//! lookup of the bound name lands on the same bound node, so the binding
//! reduces once no matter how many places read it.

use std::fmt;
use std::sync::Arc;

use crate::runtime::env::{EnvArena, EnvId};
use crate::runtime::failure::Failure;
use crate::runtime::value::Value;
use crate::term::{Literal, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum NodeState {
    /// Blocked on other nodes; woken when the last blocker settles.
    Pending,
    /// In the frontier; the next round may step it.
    Ready,
    /// A foreign call is in flight; the completion settles it.
    Dispatched,
    /// Done. Settled nodes never step again.
    Reduced(Result<Value, Failure>),
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A literal; settles on its first step.
    Leaf(Value),
    /// A name; resolves through the node's environment chain.
    Lookup(String),
    /// A `fun`; settles to a closure capturing the node's environment.
    MakeClosure {
        params: Vec<String>,
        body: Arc<Term>,
    },
    /// An application; steps once the callee settles, then turns itself
    /// into a proxy for the instantiated body.
    Apply { callee: NodeId, args: Vec<NodeId> },
    /// Forwards another node's result.
    Proxy(NodeId),
    /// A foreign call; dispatches once every argument settles.
    Foreign {
        module: String,
        symbol: String,
        args: Vec<NodeId>,
    },
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Leaf(value) => write!(f, "leaf {}", value),
            NodeKind::Lookup(name) => write!(f, "lookup {}", name),
            NodeKind::MakeClosure { params, .. } => write!(f, "closure({})", params.join(", ")),
            NodeKind::Apply { callee, args } => {
                write!(f, "apply {} to {} arg(s)", callee, args.len())
            }
            NodeKind::Proxy(of) => write!(f, "proxy {}", of),
            NodeKind::Foreign {
                module,
                symbol,
                args,
            } => write!(f, "foreign {}.{}/{}", module, symbol, args.len()),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub state: NodeState,
    pub env: EnvId,
    /// Nodes to wake (or poison) when this one settles.
    pub dependents: Vec<NodeId>,
    /// Outstanding dependencies; the node becomes ready at zero.
    pub blockers: u32,
}

#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn is_reduced(&self, id: NodeId) -> bool {
        matches!(self.node(id).state, NodeState::Reduced(_))
    }

    pub fn result(&self, id: NodeId) -> Option<&Result<Value, Failure>> {
        match &self.node(id).state {
            NodeState::Reduced(result) => Some(result),
            _ => None,
        }
    }

    fn alloc(&mut self, kind: NodeKind, env: EnvId) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            kind,
            state: NodeState::Ready,
            env,
            dependents: Vec::new(),
            blockers: 0,
        });
        id
    }

    /// A ready node that settles directly to `value`.
    pub fn leaf(&mut self, value: Value, env: EnvId) -> NodeId {
        self.alloc(NodeKind::Leaf(value), env)
    }

    /// Build nodes for `term` against `env` and return the node standing
    /// for the whole expression. New nodes start ready; the caller picks
    /// them up by watching the graph length.
    pub fn instantiate(&mut self, arena: &mut EnvArena, term: &Term, env: EnvId) -> NodeId {
        match term {
            Term::Literal(literal) => self.alloc(NodeKind::Leaf(literal_value(literal)), env),
            Term::Var(name) | Term::Hole(name) => {
                self.alloc(NodeKind::Lookup(name.clone()), env)
            }
            Term::Lambda { params, body } => self.alloc(
                NodeKind::MakeClosure {
                    params: params.clone(),
                    body: Arc::clone(body),
                },
                env,
            ),
            Term::Apply { callee, args } => {
                let callee = self.instantiate(arena, callee, env);
                let args = args
                    .iter()
                    .map(|arg| self.instantiate(arena, arg, env))
                    .collect();
                self.alloc(NodeKind::Apply { callee, args }, env)
            }
            Term::Let { name, bound, body } => {
                let child = arena.alloc(env);
                let bound_node = self.instantiate(arena, bound, child);
                arena.bind_node(child, name, bound_node);
                self.instantiate(arena, body, child)
            }
            Term::ForeignCall {
                module,
                symbol,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.instantiate(arena, arg, env))
                    .collect();
                self.alloc(
                    NodeKind::Foreign {
                        module: module.clone(),
                        symbol: symbol.clone(),
                        args,
                    },
                    env,
                )
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(v) => Value::Int(*v),
        Literal::Float(v) => Value::Float(*v),
        Literal::Bool(v) => Value::Bool(*v),
        Literal::Str(v) => Value::str(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn test_instantiate_literal_is_single_leaf() {
        let mut graph = Graph::new();
        let mut arena = EnvArena::new();
        let root = graph.instantiate(&mut arena, &Term::int(7), EnvId::GLOBAL);

        assert_eq!(graph.len(), 1);
        assert!(matches!(
            graph.node(root).kind,
            NodeKind::Leaf(Value::Int(7))
        ));
        assert!(matches!(graph.node(root).state, NodeState::Ready));
    }

    #[test]
    fn test_let_shares_bound_node() {
        // let x = 1 in add(x, x): both lookups resolve to the same bound
        // node through the child environment.
        let mut graph = Graph::new();
        let mut arena = EnvArena::new();
        let term = Term::Let {
            name: "x".to_string(),
            bound: Arc::new(Term::int(1)),
            body: Arc::new(Term::apply(
                Term::var("add"),
                vec![Term::var("x"), Term::var("x")],
            )),
        };
        let root = graph.instantiate(&mut arena, &term, EnvId::GLOBAL);

        // leaf 1, lookup add, lookup x, lookup x, apply; no node for the let
        assert_eq!(graph.len(), 5);
        assert!(matches!(graph.node(root).kind, NodeKind::Apply { .. }));

        let child = graph.node(root).env;
        assert_ne!(child, EnvId::GLOBAL);
        let bound = match arena.resolve(child, "x") {
            crate::runtime::env::Resolution::Node(node) => node,
            other => panic!("expected node binding, got {:?}", other),
        };
        assert!(matches!(
            graph.node(bound).kind,
            NodeKind::Leaf(Value::Int(1))
        ));
    }

    #[test]
    fn test_foreign_call_collects_argument_nodes() {
        let mut graph = Graph::new();
        let mut arena = EnvArena::new();
        let term = Term::ForeignCall {
            module: "calc".to_string(),
            symbol: "add".to_string(),
            args: vec![Arc::new(Term::int(1)), Arc::new(Term::int(2))],
        };
        let root = graph.instantiate(&mut arena, &term, EnvId::GLOBAL);

        match &graph.node(root).kind {
            NodeKind::Foreign {
                module,
                symbol,
                args,
            } => {
                assert_eq!(module, "calc");
                assert_eq!(symbol, "add");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected foreign node, got {}", other),
        }
    }
}
