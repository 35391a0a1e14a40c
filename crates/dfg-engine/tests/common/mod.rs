//! Shared test catalog: a small calendar domain plus types that fail on
//! purpose.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dfg_core::{
    DialogContext, DomainError, ExceptionAction, ExceptionId, NodeBehavior, NodeError, NodeId,
    ParamDef, Signature, TypeRegistry, Value, ViewMode,
};
use dfg_engine::{construct_graph, ConstructOptions};
use indexmap::IndexSet;

/// Type with a signature and no behavior of its own.
pub struct Plain(pub Signature);

impl NodeBehavior for Plain {
    fn signature(&self) -> &Signature {
        &self.0
    }
}

/// `Tomorrow()`: resolves to `DateTime(day=2)`.
pub struct Tomorrow(Signature);

impl NodeBehavior for Tomorrow {
    fn signature(&self) -> &Signature {
        &self.0
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        let dt = ctx.create("DateTime")?;
        let day = ctx.create_value(Value::Int(2))?;
        ctx.add_input(dt, "day", day, ViewMode::Extension)?;
        ctx.mark_evaluated(day)?;
        ctx.mark_evaluated(dt)?;
        ctx.set_result(node, dt)?;
        Ok(())
    }
}

/// `Fail(...)`: always raises a domain exception.
pub struct Fail(Signature);

impl NodeBehavior for Fail {
    fn signature(&self) -> &Signature {
        &self.0
    }

    fn evaluate(&self, _ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        Err(DomainError::new("failed on purpose")
            .at(node)
            .suggest("Tomorrow()", false)
            .into())
    }
}

/// `Panic()`: an internal fault.
pub struct Panic(Signature);

impl NodeBehavior for Panic {
    fn signature(&self) -> &Signature {
        &self.0
    }

    fn evaluate(&self, _ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        Err(NodeError::fault(node, "backend unavailable"))
    }
}

/// `Recover(arg)`: evaluates even when its input failed.
pub struct Recover(Signature);

impl NodeBehavior for Recover {
    fn signature(&self) -> &Signature {
        &self.0
    }

    fn allows_exception(&self, _: &DialogContext, _: NodeId, _: &IndexSet<ExceptionId>) -> ExceptionAction {
        ExceptionAction::Proceed
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        let text = ctx.create_value(Value::Str("recovered".into()))?;
        ctx.set_result(node, text)?;
        Ok(())
    }
}

/// `Explain(arg)`: stays failed and adds its own, chained exception.
pub struct Explain(Signature);

impl NodeBehavior for Explain {
    fn signature(&self) -> &Signature {
        &self.0
    }

    fn allows_exception(&self, _: &DialogContext, _: NodeId, _: &IndexSet<ExceptionId>) -> ExceptionAction {
        ExceptionAction::Chain(DomainError::new("could not explain"))
    }
}

/// `Count(...)`: counts how often it is evaluated.
pub struct Count {
    sig: Signature,
    pub hits: Arc<AtomicUsize>,
}

impl NodeBehavior for Count {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn evaluate(&self, _ctx: &mut DialogContext, _node: NodeId) -> Result<(), NodeError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Catalog {
    pub registry: Arc<TypeRegistry>,
    pub count_hits: Arc<AtomicUsize>,
}

impl Catalog {
    pub fn hits(&self) -> usize {
        self.count_hits.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> DialogContext {
        DialogContext::new(self.registry.clone())
    }
}

pub fn catalog() -> Catalog {
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = TypeRegistry::register_types([
        Arc::new(Plain(
            Signature::new("Event")
                .param(ParamDef::new("subject").types(["Str"]).positional())
                .param(ParamDef::new("start").types(["DateTime"]).positional())
                .param(ParamDef::new("size").types(["Int"]).alias("attendees")),
        )) as Arc<dyn NodeBehavior>,
        Arc::new(Plain(
            Signature::new("DateTime").param(ParamDef::new("day").types(["Int"]).positional()),
        )),
        Arc::new(Plain(
            Signature::new("Person")
                .param(ParamDef::new("name").types(["Str"]).positional().required()),
        )),
        Arc::new(Tomorrow(Signature::new("Tomorrow").output("DateTime"))),
        Arc::new(Fail(
            Signature::new("Fail")
                .param(ParamDef::new("arg").positional())
                .output("DateTime"),
        )),
        Arc::new(Panic(Signature::new("Panic"))),
        Arc::new(Recover(Signature::new("Recover").param(ParamDef::new("arg").positional()))),
        Arc::new(Explain(Signature::new("Explain").param(ParamDef::new("arg").positional()))),
        Arc::new(Count {
            sig: Signature::new("Count").operator(),
            hits: hits.clone(),
        }),
    ])
    .expect("test catalog has unique names");
    Catalog {
        registry: Arc::new(registry),
        count_hits: hits,
    }
}

pub fn build(ctx: &mut DialogContext, text: &str) -> NodeId {
    construct_graph(ctx, text, &ConstructOptions::default())
        .unwrap_or_else(|e| panic!("failed to build {text:?}: {e}"))
}
