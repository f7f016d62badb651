//! The opportunistic scheduler.
//!
//! Reduction proceeds in rounds over a frontier of ready nodes. Each round
//! has two phases: a planning phase that inspects every ready node and
//! decides its next move without touching anything, and an apply phase that
//! executes the plans one at a time. Planning is pure, so large frontiers
//! are planned in parallel with rayon; applying is serial, which keeps the
//! graph free of locks. Any ready node may step in any order; for the pure
//! fragment of a program every order reaches the same result, and tests
//! exercise that by reshuffling the frontier.
//!
//! Foreign calls leave the round machinery entirely. A dispatched node sits
//! out until its completion arrives on the bridge channel, times out, or the
//! run is cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::foreign::{CallId, CallOutcome, CancelToken, ForeignBridge, TraceRecord};
use crate::runtime::env::{EnvArena, EnvId, Resolution, Slot};
use crate::runtime::failure::{Failure, ForeignErrorKind};
use crate::runtime::graph::{Graph, NodeId, NodeKind, NodeState};
use crate::runtime::value::{Closure, ForeignFn, Value};
use crate::syntax::program::{Decl, Program};
use crate::term::Term;

/// Below this frontier size a parallel plan costs more than it saves.
const PARALLEL_PLAN_THRESHOLD: usize = 16;

/// Upper bound on one blocking wait for completions, so cancellation and
/// deadlines are noticed promptly even when no call has a deadline.
const COMPLETION_POLL: Duration = Duration::from_millis(25);

/// Which end of the frontier steps first. The result of a pure program does
/// not depend on this; the orders exist to prove that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierOrder {
    Fifo,
    Lifo,
    Seeded(u64),
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Wall-clock budget for the whole run.
    pub timeout: Option<Duration>,
    /// Deadline applied to each foreign dispatch.
    pub call_timeout: Option<Duration>,
    /// Step budget; runaway recursion ends in `OutOfFuel` instead of
    /// spinning forever.
    pub max_steps: Option<u64>,
    pub order: FrontierOrder,
    /// Log rounds and dispatches to stderr.
    pub trace: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            timeout: None,
            call_timeout: None,
            max_steps: None,
            order: FrontierOrder::Fifo,
            trace: false,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The last declaration settled to a value.
    Value(Value),
    /// The last declaration settled to a failure.
    Failure(Failure),
    /// Evaluation quiesced with work still blocked; the names are the
    /// bindings that never resolved (holes with waiters, or members of a
    /// dependency cycle).
    Stalled { unresolved: Vec<String> },
    OutOfFuel { steps: u64 },
    TimedOut,
    Cancelled,
    /// The program bound nothing and computed nothing.
    Empty,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub steps: u64,
    pub rounds: u64,
    pub dispatches: u64,
}

/// What one ready node does next. Produced by the planning phase, executed
/// by the apply phase; everything a plan needs is copied in so planning can
/// run on worker threads.
enum StepPlan {
    Settle(Result<Value, Failure>),
    /// Become a dependent of these nodes. Re-validated at apply time, since
    /// an earlier plan in the same round may already have settled them.
    Wait(Vec<NodeId>),
    /// Park on a global hole.
    Park(String),
    /// Apply a closure: bind arguments, instantiate the body, proxy it.
    Beta {
        closure: Arc<Closure>,
        args: Vec<NodeId>,
    },
    /// An application whose callee settled to a foreign function; the node
    /// becomes a foreign-call node over the same argument nodes.
    Morph {
        module: String,
        symbol: String,
        args: Vec<NodeId>,
    },
    Dispatch {
        module: String,
        symbol: String,
        args: Vec<Value>,
    },
}

struct PendingCall {
    node: NodeId,
    module: String,
    symbol: String,
    deadline: Option<Instant>,
}

pub struct Scheduler {
    graph: Graph,
    arena: EnvArena,
    bridge: ForeignBridge,
    options: SchedulerOptions,
    cancel: CancelToken,
    frontier: Vec<NodeId>,
    pending_calls: HashMap<CallId, PendingCall>,
    root: Option<NodeId>,
    steps: u64,
    rounds: u64,
    dispatches: u64,
}

impl Scheduler {
    pub fn new(bridge: ForeignBridge, options: SchedulerOptions) -> Self {
        let cancel = bridge.cancel_token();
        Scheduler {
            graph: Graph::new(),
            arena: EnvArena::new(),
            bridge,
            options,
            cancel,
            frontier: Vec::new(),
            pending_calls: HashMap::new(),
            root: None,
            steps: 0,
            rounds: 0,
            dispatches: 0,
        }
    }

    /// Shared cancellation flag; cancelling it from any thread ends the run
    /// at the next round boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn trace(&self) -> Vec<TraceRecord> {
        self.bridge.trace().snapshot()
    }

    /// Install a program's top-level declarations. Slots for every bound
    /// name are created up front, so forward references inside any bound
    /// term resolve no matter the declaration order. The last declaration's
    /// node becomes the run's result.
    pub fn load_program(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Fun { name, .. } | Decl::Assign { name, .. } => {
                    self.arena.declare_hole(EnvId::GLOBAL, name);
                }
                Decl::Alias { name, target, .. } => {
                    self.arena.declare_alias(EnvId::GLOBAL, name, target);
                }
                Decl::Use { alias, .. } => {
                    self.arena.declare_hole(EnvId::GLOBAL, alias);
                }
                Decl::Expr { .. } => {}
            }
        }
        self.arena.compress_aliases();

        for decl in &program.decls {
            let node = match decl {
                Decl::Fun { name, term, .. } | Decl::Assign { name, term, .. } => {
                    let node = self
                        .graph
                        .instantiate(&mut self.arena, term, EnvId::GLOBAL);
                    self.arena.bind_node(EnvId::GLOBAL, name, node);
                    node
                }
                Decl::Alias { name, .. } => {
                    // The aliased binding's value stands for this declaration.
                    self.graph
                        .instantiate(&mut self.arena, &Term::var(name.clone()), EnvId::GLOBAL)
                }
                Decl::Use {
                    module,
                    symbol,
                    alias,
                    ..
                } => {
                    let value = Value::ForeignFn(Arc::new(ForeignFn {
                        module: module.clone(),
                        symbol: symbol.clone(),
                        arity: self.bridge.arity_of(module, symbol),
                    }));
                    self.arena.bind_value(EnvId::GLOBAL, alias, value.clone());
                    self.graph.leaf(value, EnvId::GLOBAL)
                }
                Decl::Expr { term, .. } => {
                    self.graph
                        .instantiate(&mut self.arena, term, EnvId::GLOBAL)
                }
            };
            self.root = Some(node);
        }

        self.frontier = (0..self.graph.len()).map(NodeId::new).collect();
    }

    pub fn run(&mut self) -> Evaluation {
        let started = Instant::now();
        let deadline = self.options.timeout.map(|t| started + t);

        let outcome = loop {
            if self.cancel.is_cancelled() {
                self.fail_in_flight(ForeignErrorKind::Cancelled);
                break Outcome::Cancelled;
            }
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                self.cancel.cancel();
                self.fail_in_flight(ForeignErrorKind::Timeout);
                break Outcome::TimedOut;
            }

            if self.frontier.is_empty() {
                if self.pending_calls.is_empty() {
                    break self.classify();
                }
                self.drain_completions(true, deadline);
                continue;
            }

            if let Some(exhausted) = self.round() {
                break exhausted;
            }
            self.drain_completions(false, deadline);
        };

        Evaluation {
            outcome,
            steps: self.steps,
            rounds: self.rounds,
            dispatches: self.dispatches,
        }
    }

    /// One plan/apply round over the current frontier. Returns an outcome
    /// only when the step budget runs out mid-round.
    fn round(&mut self) -> Option<Outcome> {
        let mut runnable = std::mem::take(&mut self.frontier);
        runnable.retain(|&id| matches!(self.graph.node(id).state, NodeState::Ready));
        if runnable.is_empty() {
            return None;
        }
        self.rounds += 1;

        match self.options.order {
            FrontierOrder::Fifo => {}
            FrontierOrder::Lifo => runnable.reverse(),
            FrontierOrder::Seeded(seed) => {
                shuffle(&mut runnable, seed.wrapping_add(self.rounds))
            }
        }

        let graph = &self.graph;
        let arena = &self.arena;
        let plans: Vec<(NodeId, StepPlan)> = if runnable.len() >= PARALLEL_PLAN_THRESHOLD {
            runnable
                .par_iter()
                .map(|&id| (id, plan_step(graph, arena, id)))
                .collect()
        } else {
            runnable
                .iter()
                .map(|&id| (id, plan_step(graph, arena, id)))
                .collect()
        };

        if self.options.trace {
            eprintln!(
                "[round {}] stepping {} node(s), graph {}",
                self.rounds,
                plans.len(),
                self.graph.len()
            );
        }

        for (id, plan) in plans {
            if let Some(max) = self.options.max_steps
                && self.steps >= max
            {
                self.frontier.push(id);
                return Some(Outcome::OutOfFuel { steps: self.steps });
            }
            self.apply_plan(id, plan);
        }
        None
    }

    fn apply_plan(&mut self, id: NodeId, plan: StepPlan) {
        // An earlier plan in this round may have poisoned this node.
        if self.graph.is_reduced(id) {
            return;
        }
        self.steps += 1;

        match plan {
            StepPlan::Settle(result) => self.settle(id, result),
            StepPlan::Wait(targets) => {
                let mut blockers = 0;
                for target in targets {
                    if self.graph.is_reduced(target) {
                        continue;
                    }
                    let dependents = &mut self.graph.node_mut(target).dependents;
                    if !dependents.contains(&id) {
                        dependents.push(id);
                    }
                    blockers += 1;
                }
                if blockers == 0 {
                    // Everything settled between plan and apply; go again.
                    self.graph.node_mut(id).state = NodeState::Ready;
                    self.frontier.push(id);
                } else {
                    let node = self.graph.node_mut(id);
                    node.blockers = blockers;
                    node.state = NodeState::Pending;
                }
            }
            StepPlan::Park(name) => {
                self.arena.park(&name, id);
                let node = self.graph.node_mut(id);
                node.blockers = 1;
                node.state = NodeState::Pending;
            }
            StepPlan::Beta { closure, args } => {
                let child = self.arena.alloc(closure.env);
                for (param, arg) in closure.params.iter().zip(&args) {
                    self.arena.bind_node(child, param, *arg);
                }
                let watermark = self.graph.len();
                let body = self
                    .graph
                    .instantiate(&mut self.arena, &closure.body, child);
                self.adopt_new_nodes(watermark);

                let node = self.graph.node_mut(id);
                node.kind = NodeKind::Proxy(body);
                node.state = NodeState::Pending;
                node.blockers = 1;
                self.graph.node_mut(body).dependents.push(id);
            }
            StepPlan::Morph {
                module,
                symbol,
                args,
            } => {
                let node = self.graph.node_mut(id);
                node.kind = NodeKind::Foreign {
                    module,
                    symbol,
                    args,
                };
                node.state = NodeState::Ready;
                self.frontier.push(id);
            }
            StepPlan::Dispatch {
                module,
                symbol,
                args,
            } => {
                if let Some(expected) = self.bridge.arity_of(&module, &symbol)
                    && expected != args.len()
                {
                    let failure = Failure::Arity {
                        callee: format!("{}.{}", module, symbol),
                        expected,
                        got: args.len(),
                    };
                    self.settle(id, Err(failure));
                    return;
                }

                if self.options.trace {
                    eprintln!("[dispatch] {}.{}/{}", module, symbol, args.len());
                }
                let call = self.bridge.dispatch(&module, &symbol, args);
                let deadline = self.options.call_timeout.map(|t| Instant::now() + t);
                self.pending_calls.insert(
                    call,
                    PendingCall {
                        node: id,
                        module,
                        symbol,
                        deadline,
                    },
                );
                self.graph.node_mut(id).state = NodeState::Dispatched;
                self.dispatches += 1;
            }
        }
    }

    fn adopt_new_nodes(&mut self, watermark: usize) {
        for index in watermark..self.graph.len() {
            self.frontier.push(NodeId::new(index));
        }
    }

    /// Finish a node. A value wakes dependents; a failure poisons them
    /// transitively without ever putting them in the frontier.
    fn settle(&mut self, id: NodeId, result: Result<Value, Failure>) {
        if self.graph.is_reduced(id) {
            return;
        }
        let dependents = std::mem::take(&mut self.graph.node_mut(id).dependents);
        match result {
            Ok(value) => {
                self.graph.node_mut(id).state = NodeState::Reduced(Ok(value));
                for dependent in dependents {
                    let node = self.graph.node_mut(dependent);
                    if matches!(node.state, NodeState::Reduced(_)) {
                        continue;
                    }
                    node.blockers = node.blockers.saturating_sub(1);
                    if node.blockers == 0 && matches!(node.state, NodeState::Pending) {
                        node.state = NodeState::Ready;
                        self.frontier.push(dependent);
                    }
                }
            }
            Err(failure) => {
                self.graph
                    .node_mut(id)
                    .state = NodeState::Reduced(Err(failure.clone()));
                self.poison(dependents, &failure);
            }
        }
    }

    fn poison(&mut self, seeds: Vec<NodeId>, failure: &Failure) {
        let mut stack = seeds;
        while let Some(id) = stack.pop() {
            if self.graph.is_reduced(id) {
                continue;
            }
            let node = self.graph.node_mut(id);
            node.state = NodeState::Reduced(Err(failure.clone()));
            stack.extend(std::mem::take(&mut node.dependents));
        }
    }

    fn drain_completions(&mut self, block: bool, global_deadline: Option<Instant>) {
        self.expire_overdue_calls();

        if block && !self.pending_calls.is_empty() {
            let wait = self.wait_budget(global_deadline);
            if !wait.is_zero()
                && let Some(outcome) = self.bridge.recv_timeout(wait)
            {
                self.complete_call(outcome);
            }
            self.expire_overdue_calls();
        }

        while let Some(outcome) = self.bridge.try_recv() {
            self.complete_call(outcome);
        }
    }

    fn wait_budget(&self, global_deadline: Option<Instant>) -> Duration {
        let now = Instant::now();
        let mut budget = COMPLETION_POLL;
        let nearest_call = self
            .pending_calls
            .values()
            .filter_map(|call| call.deadline)
            .min();
        for candidate in [nearest_call, global_deadline].into_iter().flatten() {
            budget = budget.min(candidate.saturating_duration_since(now));
        }
        budget
    }

    fn expire_overdue_calls(&mut self) {
        let now = Instant::now();
        let overdue: Vec<CallId> = self
            .pending_calls
            .iter()
            .filter(|(_, call)| call.deadline.is_some_and(|d| now >= d))
            .map(|(&call, _)| call)
            .collect();
        for call in overdue {
            if let Some(pending) = self.pending_calls.remove(&call) {
                self.settle(
                    pending.node,
                    Err(Failure::Foreign {
                        module: pending.module,
                        symbol: pending.symbol,
                        kind: ForeignErrorKind::Timeout,
                        message: String::new(),
                    }),
                );
            }
        }
    }

    fn complete_call(&mut self, outcome: CallOutcome) {
        // Unknown ids are completions that already timed out; drop them.
        let Some(pending) = self.pending_calls.remove(&outcome.call) else {
            return;
        };
        let node = pending.node;
        let result = outcome.result.map_err(|err| Failure::Foreign {
            module: pending.module,
            symbol: pending.symbol,
            kind: err.kind,
            message: err.message,
        });
        self.settle(node, result);
    }

    /// Mark every in-flight call failed with `kind`. Used when the run ends
    /// before the workers do; their eventual results are dropped.
    fn fail_in_flight(&mut self, kind: ForeignErrorKind) {
        let pending: Vec<PendingCall> = self
            .pending_calls
            .drain()
            .map(|(_, call)| call)
            .collect();
        for call in pending {
            self.settle(
                call.node,
                Err(Failure::Foreign {
                    module: call.module,
                    symbol: call.symbol,
                    kind,
                    message: String::new(),
                }),
            );
        }
    }

    fn classify(&self) -> Outcome {
        let Some(root) = self.root else {
            return Outcome::Empty;
        };
        match self.graph.result(root) {
            Some(Ok(value)) => Outcome::Value(value.clone()),
            Some(Err(failure)) => Outcome::Failure(failure.clone()),
            None => {
                let mut unresolved = self.arena.unresolved_names();
                if unresolved.is_empty() {
                    unresolved = self.stuck_global_bindings();
                }
                Outcome::Stalled { unresolved }
            }
        }
    }

    /// Global bindings whose nodes never settled; with no unresolved holes
    /// these are the members of a dependency cycle.
    fn stuck_global_bindings(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .arena
            .global_slots()
            .filter_map(|(name, slot)| match slot {
                Slot::Node(node) if !self.graph.is_reduced(*node) => Some(name.to_string()),
                _ => None,
            })
            .collect();
        names.sort();
        names
    }
}

/// Plan one ready node. Pure: reads the graph and environments, writes
/// nothing, so any number of these can run at once.
fn plan_step(graph: &Graph, arena: &EnvArena, id: NodeId) -> StepPlan {
    let node = graph.node(id);
    match &node.kind {
        NodeKind::Leaf(value) => StepPlan::Settle(Ok(value.clone())),
        NodeKind::Lookup(name) => match arena.resolve(node.env, name) {
            Resolution::Value(value) => StepPlan::Settle(Ok(value)),
            Resolution::Node(target) => match graph.result(target) {
                Some(result) => StepPlan::Settle(result.clone()),
                None => StepPlan::Wait(vec![target]),
            },
            Resolution::Unbound(name) => StepPlan::Park(name),
        },
        NodeKind::MakeClosure { params, body } => {
            StepPlan::Settle(Ok(Value::Closure(Arc::new(Closure {
                params: params.clone(),
                body: Arc::clone(body),
                env: node.env,
            }))))
        }
        NodeKind::Apply { callee, args } => match graph.result(*callee) {
            None => StepPlan::Wait(vec![*callee]),
            Some(Err(failure)) => StepPlan::Settle(Err(failure.clone())),
            Some(Ok(Value::Closure(closure))) => {
                if closure.params.len() != args.len() {
                    StepPlan::Settle(Err(Failure::Arity {
                        callee: "function".to_string(),
                        expected: closure.params.len(),
                        got: args.len(),
                    }))
                } else {
                    StepPlan::Beta {
                        closure: Arc::clone(closure),
                        args: args.clone(),
                    }
                }
            }
            Some(Ok(Value::ForeignFn(foreign))) => StepPlan::Morph {
                module: foreign.module.clone(),
                symbol: foreign.symbol.clone(),
                args: args.clone(),
            },
            Some(Ok(other)) => StepPlan::Settle(Err(Failure::NotCallable {
                type_name: other.type_name(),
            })),
        },
        NodeKind::Proxy(of) => match graph.result(*of) {
            Some(result) => StepPlan::Settle(result.clone()),
            None => StepPlan::Wait(vec![*of]),
        },
        NodeKind::Foreign {
            module,
            symbol,
            args,
        } => {
            let mut waiting = Vec::new();
            let mut values = Vec::with_capacity(args.len());
            for &arg in args {
                match graph.result(arg) {
                    None => waiting.push(arg),
                    Some(Err(failure)) => return StepPlan::Settle(Err(failure.clone())),
                    Some(Ok(value)) => values.push(value.clone()),
                }
            }
            if waiting.is_empty() {
                StepPlan::Dispatch {
                    module: module.clone(),
                    symbol: symbol.clone(),
                    args: values,
                }
            } else {
                StepPlan::Wait(waiting)
            }
        }
    }
}

/// Fisher-Yates driven by splitmix64, so seeded orders are reproducible
/// without pulling in a random number crate.
fn shuffle(nodes: &mut [NodeId], seed: u64) {
    let mut state = seed;
    for i in (1..nodes.len()).rev() {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        nodes.swap(i, (z % (i as u64 + 1)) as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Position;
    use crate::term::Term;

    fn expr_program(term: Term) -> Program {
        Program {
            decls: vec![Decl::Expr {
                term,
                position: Position::new(1, 0),
            }],
        }
    }

    fn evaluate(program: &Program) -> Evaluation {
        let mut scheduler = Scheduler::new(ForeignBridge::new(), SchedulerOptions::default());
        scheduler.load_program(program);
        scheduler.run()
    }

    #[test]
    fn test_literal_settles() {
        let evaluation = evaluate(&expr_program(Term::int(42)));
        assert!(matches!(evaluation.outcome, Outcome::Value(Value::Int(42))));
    }

    #[test]
    fn test_identity_application() {
        // (fun(x) { x })(5)
        let identity = Term::Lambda {
            params: vec!["x".to_string()],
            body: Arc::new(Term::var("x")),
        };
        let call = Term::apply(identity, vec![Term::int(5)]);
        let evaluation = evaluate(&expr_program(call));
        assert!(matches!(evaluation.outcome, Outcome::Value(Value::Int(5))));
    }

    #[test]
    fn test_not_callable_fails() {
        let call = Term::apply(Term::int(1), vec![]);
        let evaluation = evaluate(&expr_program(call));
        assert!(matches!(
            evaluation.outcome,
            Outcome::Failure(Failure::NotCallable { type_name: "Int" })
        ));
    }

    #[test]
    fn test_arity_mismatch_fails() {
        let identity = Term::Lambda {
            params: vec!["x".to_string()],
            body: Arc::new(Term::var("x")),
        };
        let call = Term::apply(identity, vec![Term::int(1), Term::int(2)]);
        let evaluation = evaluate(&expr_program(call));
        assert!(matches!(
            evaluation.outcome,
            Outcome::Failure(Failure::Arity {
                expected: 1,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_failure_does_not_take_down_independent_branch() {
        // A failing application in one declaration, a literal in the last:
        // the failure is confined to its own branch.
        let program = Program {
            decls: vec![
                Decl::Expr {
                    term: Term::apply(Term::int(1), vec![]),
                    position: Position::new(1, 0),
                },
                Decl::Expr {
                    term: Term::int(7),
                    position: Position::new(2, 0),
                },
            ],
        };
        let evaluation = evaluate(&program);
        assert!(matches!(evaluation.outcome, Outcome::Value(Value::Int(7))));
    }

    #[test]
    fn test_unresolved_hole_stalls() {
        let evaluation = evaluate(&expr_program(Term::hole("ghost")));
        match evaluation.outcome {
            Outcome::Stalled { unresolved } => assert_eq!(unresolved, vec!["ghost"]),
            other => panic!("expected stalled run, got {:?}", other),
        }
    }

    #[test]
    fn test_forward_reference_resolves() {
        // f() where f is declared afterwards.
        let program = Program {
            decls: vec![
                Decl::Expr {
                    term: Term::apply(Term::hole("f"), vec![]),
                    position: Position::new(1, 0),
                },
                Decl::Fun {
                    name: "f".to_string(),
                    term: Term::Lambda {
                        params: vec![],
                        body: Arc::new(Term::int(9)),
                    },
                    position: Position::new(2, 0),
                },
            ],
        };
        // Result is the last declaration (the closure); the point is that
        // the first one settles instead of stalling.
        let mut scheduler = Scheduler::new(ForeignBridge::new(), SchedulerOptions::default());
        scheduler.load_program(&program);
        let evaluation = scheduler.run();
        assert!(matches!(
            evaluation.outcome,
            Outcome::Value(Value::Closure(_))
        ));
    }

    #[test]
    fn test_runaway_recursion_runs_out_of_fuel() {
        // (fun(x) { x(x) })(fun(x) { x(x) })
        let self_apply = || Term::Lambda {
            params: vec!["x".to_string()],
            body: Arc::new(Term::apply(Term::var("x"), vec![Term::var("x")])),
        };
        let omega = Term::apply(self_apply(), vec![self_apply()]);
        let mut scheduler = Scheduler::new(
            ForeignBridge::new(),
            SchedulerOptions {
                max_steps: Some(500),
                ..Default::default()
            },
        );
        scheduler.load_program(&expr_program(omega));
        let evaluation = scheduler.run();
        assert!(matches!(evaluation.outcome, Outcome::OutOfFuel { .. }));
    }

    #[test]
    fn test_unlinked_foreign_call_yields_opaque_and_trace() {
        let call = Term::ForeignCall {
            module: "trace".to_string(),
            symbol: "print".to_string(),
            args: vec![Arc::new(Term::int(3))],
        };
        let mut scheduler = Scheduler::new(ForeignBridge::new(), SchedulerOptions::default());
        scheduler.load_program(&expr_program(call));
        let evaluation = scheduler.run();

        match evaluation.outcome {
            Outcome::Value(Value::Opaque { module, token }) => {
                assert_eq!(&*module, "trace");
                assert_eq!(token, 0);
            }
            other => panic!("expected opaque result, got {:?}", other),
        }
        assert_eq!(evaluation.dispatches, 1);
        let trace = scheduler.trace();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].to_string(), "CALL trace.print(3)");
    }

    #[test]
    fn test_frontier_orders_agree_on_pure_result() {
        let build = || {
            // let f = fun(x) { x } in f(f(11))
            let lambda = Term::Lambda {
                params: vec!["x".to_string()],
                body: Arc::new(Term::var("x")),
            };
            Term::Let {
                name: "f".to_string(),
                bound: Arc::new(lambda),
                body: Arc::new(Term::apply(
                    Term::var("f"),
                    vec![Term::apply(Term::var("f"), vec![Term::int(11)])],
                )),
            }
        };
        for order in [
            FrontierOrder::Fifo,
            FrontierOrder::Lifo,
            FrontierOrder::Seeded(1),
            FrontierOrder::Seeded(99),
        ] {
            let mut scheduler = Scheduler::new(
                ForeignBridge::new(),
                SchedulerOptions {
                    order,
                    ..Default::default()
                },
            );
            scheduler.load_program(&expr_program(build()));
            let evaluation = scheduler.run();
            assert!(
                matches!(evaluation.outcome, Outcome::Value(Value::Int(11))),
                "order {:?} diverged: {:?}",
                order,
                evaluation.outcome
            );
        }
    }
}
