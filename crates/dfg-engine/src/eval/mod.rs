//! Graph evaluation.
//!
//! [`evaluate_graph`] adds a goal to the context and evaluates it depth-first:
//! inputs before parents, each node at most once per pass. Domain exceptions
//! are recorded on the context and mark the failing subtree; they do not
//! stop sibling subtrees unless a node asks for that. Internal faults are
//! handled by the session's [`FaultPolicy`].

use std::collections::{HashMap, HashSet};

use dfg_core::{
    DialogContext, DomainError, ExceptionAction, ExceptionId, FaultPolicy, NodeError, NodeId,
};
use indexmap::IndexSet;

use crate::error::EngineError;

pub mod integrity;
pub mod trace;

pub use integrity::{check_dangling_nodes, IntegrityViolation};
pub use trace::TraceEntry;

/// Configuration for the evaluator.
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    /// Whether to record a trace of node visits.
    pub trace_enabled: bool,
}

/// Outcome of evaluating one goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutcome {
    pub goal: NodeId,
    pub ok: bool,
    /// Exceptions raised in the goal's subtree, in the order they were raised.
    pub exceptions: IndexSet<ExceptionId>,
}

/// Per-node evaluation state within one pass.
type Visit = (bool, IndexSet<ExceptionId>);

/// Evaluate `goal` with the default configuration.
pub fn evaluate_graph(
    ctx: &mut DialogContext,
    goal: NodeId,
    add_goal: bool,
) -> Result<EvalOutcome, EngineError> {
    Evaluator::new(EvalConfig::default()).evaluate_graph(ctx, goal, add_goal)
}

/// Depth-first evaluator. Reusable across goals; memoization is per pass.
#[derive(Debug, Default)]
pub struct Evaluator {
    config: EvalConfig,
    memo: HashMap<NodeId, Visit>,
    in_progress: HashSet<NodeId>,
    trace: Option<Vec<TraceEntry>>,
    last_error: Option<DomainError>,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        let trace = config.trace_enabled.then(Vec::new);
        Evaluator {
            config,
            trace,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Recorded trace, when tracing is enabled.
    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    /// Evaluate `goal`, first adding it to the goal list when `add_goal` is set.
    ///
    /// The set of nodes reachable from the goal list before this goal is
    /// recorded for history lookups (`refer`, `revise`).
    pub fn evaluate_graph(
        &mut self,
        ctx: &mut DialogContext,
        goal: NodeId,
        add_goal: bool,
    ) -> Result<EvalOutcome, EngineError> {
        let before = ctx.reachable_from(ctx.goals().to_vec());
        ctx.set_prev_reachable(before);
        if add_goal {
            ctx.add_goal(goal)?;
        }
        self.memo.clear();
        self.in_progress.clear();
        self.last_error = None;

        let visit = self.recursive_eval(ctx, goal);
        let (ok, exceptions) = apply_fault_policy(ctx, visit)?;
        tracing::debug!(%goal, ok, exceptions = exceptions.len(), "goal evaluated");

        if ctx.config().check_integrity {
            check_dangling_nodes(ctx);
        }
        if !ok && !ctx.config().suppress_exceptions {
            if let Some(err) = self.last_error.take() {
                return Err(EngineError::Domain(err));
            }
        }
        Ok(EvalOutcome {
            goal,
            ok,
            exceptions,
        })
    }

    /// Evaluate `node`'s subtree. Returns whether it succeeded and the
    /// exceptions raised below it.
    pub fn recursive_eval(&mut self, ctx: &mut DialogContext, node: NodeId) -> Result<Visit, EngineError> {
        if let Some(done) = self.memo.get(&node) {
            return Ok(done.clone());
        }
        let Some(n) = ctx.node(node) else {
            return self.fault(node, format!("node {node} is missing"));
        };
        if n.evaluated {
            return Ok((true, IndexSet::new()));
        }
        if !self.in_progress.insert(node) {
            tracing::debug!(%node, "cycle reached during evaluation");
            return Ok((true, IndexSet::new()));
        }
        let children: Vec<NodeId> = n.children().collect();
        let is_constraint = n.is_constraint();
        let behavior = match ctx.registry().behavior(&n.type_name) {
            Ok(b) => b,
            Err(err) => return self.fault(node, err.to_string()),
        };

        let mut ok = true;
        let mut exceptions = IndexSet::new();
        for child in children {
            if !ok && behavior.stop_eval_on_exception() {
                break;
            }
            let (child_ok, child_exceptions) = self.recursive_eval(ctx, child)?;
            ok &= child_ok;
            exceptions.extend(child_exceptions);
        }

        let proceed = ok || match behavior.allows_exception(ctx, node, &exceptions) {
            ExceptionAction::Proceed => true,
            ExceptionAction::Decline => false,
            ExceptionAction::Chain(err) => {
                let mut err = err;
                err.node = err.node.or(Some(node));
                if let Some(prior) = exceptions.last() {
                    err.chained_from = err.chained_from.or(Some(*prior));
                }
                exceptions.insert(self.record(ctx, err));
                false
            }
        };

        let mut node_ok = false;
        let mut ran = false;
        if proceed {
            ran = true;
            // Constraints describe objects; only their parts are evaluated.
            let computed = if is_constraint {
                Ok(())
            } else {
                behavior.evaluate(ctx, node)
            };
            match computed {
                Ok(()) => {
                    ctx.mark_evaluated(node)?;
                    ctx.resolve_result_bindings(node);
                    node_ok = true;
                }
                Err(NodeError::Domain(mut err)) => {
                    err.node = err.node.or(Some(node));
                    tracing::debug!(%node, error = %err, "domain exception");
                    exceptions.insert(self.record(ctx, err));
                }
                Err(NodeError::Fault { node: at, message }) => {
                    return self.fault(at.unwrap_or(node), message);
                }
            }
        }

        if node_ok && behavior.eval_res() {
            let result = ctx.get(node)?.result;
            if let Some(result) = result {
                let (res_ok, res_exceptions) = self.recursive_eval(ctx, result)?;
                exceptions.extend(res_exceptions);
                if !res_ok && behavior.res_block() {
                    node_ok = false;
                }
            }
        }

        self.in_progress.remove(&node);
        if let Some(trace) = self.trace.as_mut() {
            let n = ctx.get(node)?;
            trace.push(TraceEntry {
                node_id: node,
                node_type: n.display_type(),
                evaluated: ran,
                ok: node_ok,
                exceptions: exceptions.iter().copied().collect(),
                result: n.result,
            });
        }
        let visit = (node_ok, exceptions);
        self.memo.insert(node, visit.clone());
        Ok(visit)
    }

    fn record(&mut self, ctx: &mut DialogContext, err: DomainError) -> ExceptionId {
        self.last_error = Some(err.clone());
        ctx.record_exception(err)
    }

    fn fault<T>(&mut self, node: NodeId, message: String) -> Result<T, EngineError> {
        self.in_progress.clear();
        Err(EngineError::Fault {
            node: Some(node),
            message,
        })
    }
}

/// Apply the session's fault policy to an evaluation error.
///
/// Under [`FaultPolicy::Abort`] a fault is logged and the process ends.
pub fn apply_fault_policy<T>(
    ctx: &DialogContext,
    result: Result<T, EngineError>,
) -> Result<T, EngineError> {
    match result {
        Err(EngineError::Fault { node, message }) if ctx.config().fault_policy == FaultPolicy::Abort => {
            tracing::error!(?node, %message, "internal fault, aborting");
            std::process::abort();
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::construct::{construct_graph, ConstructOptions};
    use dfg_core::{TypeRegistry, Value};

    fn run(ctx: &mut DialogContext, text: &str) -> (NodeId, EvalOutcome) {
        let root = construct_graph(ctx, text, &ConstructOptions::default()).unwrap();
        let outcome = evaluate_graph(ctx, root, true).unwrap();
        (root, outcome)
    }

    #[test]
    fn logic_evaluates_bottom_up() {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        let (root, outcome) = run(&mut ctx, "AND(yes, NOT(no), true | false)");
        assert!(outcome.ok);
        let result = ctx.effective(root);
        assert_eq!(ctx.node(result).unwrap().data, Some(Value::Bool(true)));
        assert!(ctx.node(root).unwrap().evaluated);
        assert_eq!(ctx.goals(), &[root]);
    }

    #[test]
    fn missing_property_records_exception() {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        let (root, outcome) = run(&mut ctx, ":size(Let(x, 1))");
        assert!(!outcome.ok);
        assert_eq!(outcome.exceptions.len(), 1);
        let record = &ctx.exceptions()[0];
        assert_eq!(record.error.node, Some(root));
        assert_eq!(record.error.message, "Let has no 'size'");
        assert!(!ctx.node(root).unwrap().evaluated);
    }

    #[test]
    fn unsuppressed_exception_is_returned() {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        ctx.config_mut().suppress_exceptions = false;
        let root = construct_graph(&mut ctx, ":size(Let(x, 1))", &ConstructOptions::default()).unwrap();
        match evaluate_graph(&mut ctx, root, true) {
            Err(EngineError::Domain(err)) => assert_eq!(err.message, "Let has no 'size'"),
            other => panic!("expected domain error, got {other:?}"),
        }
        assert_eq!(ctx.exceptions().len(), 1);
    }

    #[test]
    fn trace_records_children_first() {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        let root = construct_graph(&mut ctx, "NOT(yes)", &ConstructOptions::default()).unwrap();
        let mut evaluator = Evaluator::new(EvalConfig { trace_enabled: true });
        evaluator.evaluate_graph(&mut ctx, root, true).unwrap();
        let trace = evaluator.trace().unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].node_type, "Bool");
        assert_eq!(trace[1].node_id, root);
        assert!(trace[1].result.is_some());
    }
}
