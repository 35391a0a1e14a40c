//! Registry of node types and the node factory.
//!
//! The registry maps type names to shared [`NodeBehavior`] objects. It is
//! built once per process (builtins plus an application's catalog) and
//! shared read-only between contexts through an `Arc`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::behavior::NodeBehavior;
use crate::builtins;
use crate::context::DialogContext;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::Node;
use crate::signature::{positional_role, ParamDef, Signature, ViewMode};
use crate::value::BaseKind;

/// Names that resolve to the universal `Node` type.
pub const UNIVERSAL_SYNONYMS: [&str; 1] = ["Any"];

/// Aggregator used when several nodes must travel as one.
pub const DEFAULT_AGGREGATE: &str = "SET";

/// A type name with its constraint markers resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub base: String,
    pub level: u8,
    pub output_type: Option<String>,
}

/// Behavioral classification of a registered type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub operator: bool,
    pub modifier: bool,
    pub aggregator: bool,
    pub qualifier: bool,
    pub base: bool,
    /// Exactly one non-property parameter, and it accepts only base types.
    pub leaf: bool,
}

/// Name -> behavior table.
pub struct TypeRegistry {
    types: IndexMap<String, Arc<dyn NodeBehavior>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding only the builtin types.
    pub fn new() -> Self {
        let mut types: IndexMap<String, Arc<dyn NodeBehavior>> = IndexMap::new();
        for behavior in builtins::builtin_types() {
            types.insert(behavior.signature().name.clone(), behavior);
        }
        let mut registry = TypeRegistry { types };
        registry.add_synonyms();
        registry
    }

    /// Builtins plus an application catalog.
    ///
    /// Registration is all-or-nothing: a name clash, with a builtin or within
    /// the catalog, fails the whole call.
    pub fn register_types(
        candidates: impl IntoIterator<Item = Arc<dyn NodeBehavior>>,
    ) -> Result<Self, CoreError> {
        let mut registry = TypeRegistry::new();
        for behavior in candidates {
            let name = behavior.signature().name.clone();
            if registry.types.contains_key(&name) {
                return Err(CoreError::DuplicateTypeName { name });
            }
            registry.types.insert(name, behavior);
        }
        tracing::debug!(types = registry.types.len(), "type registry built");
        Ok(registry)
    }

    fn add_synonyms(&mut self) {
        if let Some(universal) = self.types.get(builtins::UNIVERSAL).cloned() {
            for synonym in UNIVERSAL_SYNONYMS {
                self.types.insert(synonym.to_string(), universal.clone());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn NodeBehavior>> {
        self.types.get(name)
    }

    pub fn behavior(&self, name: &str) -> Result<Arc<dyn NodeBehavior>, CoreError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownNodeType {
                name: name.to_string(),
            })
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.types.get(name).map(|b| b.signature())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, synonyms included, in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Canonical name for a type, resolving synonyms.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.signature(name).map(|s| s.name.as_str()).unwrap_or(name)
    }

    /// Strip constraint markers from a type name.
    ///
    /// `T?` is level 1, `T??` level 2. `Constraint[T]` wraps one level and
    /// nests; `Constraint[T/Out]` also names an output type.
    pub fn resolve_constraint_syntax(name: &str) -> Result<ConstraintSpec, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidConstraint {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = name.trim();
        let mut spec = if let Some(inner) = trimmed
            .strip_prefix("Constraint[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let mut inner_spec = if inner.starts_with("Constraint[") {
                Self::resolve_constraint_syntax(inner)?
            } else {
                match inner.split_once('/') {
                    Some((base, out)) => {
                        if out.is_empty() {
                            return Err(invalid("empty output type"));
                        }
                        let mut s = Self::resolve_constraint_syntax(base)?;
                        s.output_type = Some(out.to_string());
                        s
                    }
                    None => Self::resolve_constraint_syntax(inner)?,
                }
            };
            inner_spec.level += 1;
            inner_spec
        } else {
            let base = trimmed.trim_end_matches('?');
            let level = trimmed.len() - base.len();
            if level > 2 {
                return Err(invalid("at most two '?' markers are supported"));
            }
            ConstraintSpec {
                base: base.to_string(),
                level: level as u8,
                output_type: None,
            }
        };

        if spec.base.is_empty() {
            return Err(invalid("missing type name"));
        }
        if spec.level > 2 {
            return Err(invalid("constraint level above 2"));
        }
        spec.base = spec.base.trim().to_string();
        Ok(spec)
    }

    /// Build an unregistered node for `name` (constraint markers allowed).
    pub fn instantiate(&self, name: &str, turn: u32) -> Result<Node, CoreError> {
        let spec = Self::resolve_constraint_syntax(name)?;
        let sig = self
            .signature(&spec.base)
            .ok_or_else(|| CoreError::UnknownNodeType {
                name: spec.base.clone(),
            })?;
        let mut node = Node::new(sig.name.clone(), spec.level, turn);
        node.output_type = spec.output_type;
        Ok(node)
    }

    /// Instantiate `name` and register it in `ctx`, stamped with the current turn.
    pub fn create(
        &self,
        ctx: &mut DialogContext,
        name: &str,
        tags: &[(String, String)],
    ) -> Result<NodeId, CoreError> {
        let mut node = self.instantiate(name, ctx.turn_num())?;
        node.tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(ctx.register(node))
    }

    pub fn base_kind(&self, name: &str) -> Option<BaseKind> {
        self.signature(name).and_then(|s| s.traits.base)
    }

    pub fn is_base(&self, name: &str) -> bool {
        self.base_kind(name).is_some()
    }

    /// The single non-property parameter of a leaf type.
    pub fn leaf_param(&self, name: &str) -> Option<&ParamDef> {
        let sig = self.signature(name)?;
        if sig.is_base() {
            return None;
        }
        let mut primary = sig.params.iter().filter(|p| !p.property);
        let param = primary.next()?;
        if primary.next().is_some() || param.types.is_empty() {
            return None;
        }
        param
            .types
            .iter()
            .all(|t| self.is_base(t))
            .then_some(param)
    }

    pub fn is_leaf(&self, name: &str) -> bool {
        self.leaf_param(name).is_some()
    }

    pub fn classify(&self, name: &str) -> Option<Classification> {
        let sig = self.signature(name)?;
        Some(Classification {
            operator: sig.traits.operator,
            modifier: sig.traits.modifier,
            aggregator: sig.traits.aggregator,
            qualifier: sig.traits.qualifier,
            base: sig.is_base(),
            leaf: self.is_leaf(name),
        })
    }

    /// Whether `child` may be bound to a parameter accepting `accepted`.
    ///
    /// Operators, qualifiers, aggregators and types whose output is the
    /// universal type are polymorphic and fit anywhere. `Int` fits `Float`.
    pub fn is_compatible(&self, child: &Node, accepted: &[String]) -> bool {
        if accepted.is_empty() {
            return true;
        }
        let child_sig = self.signature(&child.type_name);
        if let Some(sig) = child_sig {
            let t = &sig.traits;
            if t.operator || t.qualifier || t.aggregator {
                return true;
            }
            if matches!(sig.output_type.as_deref(), Some(o) if self.is_universal(o)) {
                return true;
            }
        }
        accepted.iter().any(|wanted| {
            let wanted = self.canonical_name(wanted);
            self.is_universal(wanted)
                || wanted == child.type_name
                || child.output_type.as_deref() == Some(wanted)
                || child_sig.and_then(|s| s.output_type.as_deref()) == Some(wanted)
                || (wanted == "Float" && child.type_name == "Int")
        })
    }

    fn is_universal(&self, name: &str) -> bool {
        self.canonical_name(name) == builtins::UNIVERSAL
    }

    /// Group several nodes under one aggregator node.
    ///
    /// A single node is returned unchanged unless `force` is set.
    pub fn wrap_as_aggregate(
        &self,
        ctx: &mut DialogContext,
        nodes: &[NodeId],
        aggregate_type: Option<&str>,
        force: bool,
    ) -> Result<NodeId, CoreError> {
        if let [single] = nodes {
            if !force {
                return Ok(*single);
            }
        }
        let wrapper = self.create(ctx, aggregate_type.unwrap_or(DEFAULT_AGGREGATE), &[])?;
        for (i, node) in nodes.iter().enumerate() {
            ctx.add_input(wrapper, &positional_role(i + 1), *node, ViewMode::Extension)?;
        }
        Ok(wrapper)
    }
}
