//! Construction, evaluation and simplification of dialog graphs.
//!
//! A turn is processed in three steps on one [`DialogContext`]:
//! [`construct_graph`] builds the expression into typed nodes,
//! [`evaluate_graph`] adds the result as a goal and evaluates it, and
//! [`simplify_graph`] optionally rewrites a graph into a reduced form.

pub mod construct;
pub mod error;
pub mod eval;
pub mod simplify;

pub use construct::{check_constr_graph, construct_from_ast, construct_graph, ConstructOptions};
pub use error::{ConstructError, EngineError, SimplifyError};
pub use eval::{check_dangling_nodes, evaluate_graph, EvalConfig, EvalOutcome, Evaluator};
pub use simplify::{simplify_graph, SimplifyOptions};

use dfg_core::DialogContext;

/// Run one user turn: advance the turn counter, build `text`, and evaluate
/// it as the newest goal.
///
/// Nodes are stamped with the new turn while they are built. If `text`
/// does not construct, the context is left as it was, turn counter
/// included.
pub fn process_turn(
    ctx: &mut DialogContext,
    text: &str,
    options: &ConstructOptions,
) -> Result<EvalOutcome, EngineError> {
    let turn = ctx.begin_turn();
    let root = match construct_graph(ctx, text, options) {
        Ok(root) => root,
        Err(e) => {
            ctx.abandon_turn();
            return Err(e.into());
        }
    };
    tracing::debug!(turn, %root, "turn constructed");
    evaluate_graph(ctx, root, true)
}
