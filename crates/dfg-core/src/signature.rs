//! Node-type signatures: named parameters, their accepted types and the
//! behavioral traits the constructor, evaluator and printer consult.

use serde::{Deserialize, Serialize};

use crate::value::BaseKind;

/// How a parent sees one of its inputs.
///
/// `Intension` refers to the input node itself; `Extension` refers to the
/// input's evaluation result (which is the node itself until it has one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewMode {
    Intension,
    #[default]
    Extension,
}

/// Declaration of one parameter of a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub aliases: Vec<String>,
    /// Accepted type names; empty accepts any type.
    pub types: Vec<String>,
    /// Whether unnamed arguments may bind to this parameter by position.
    pub positional: bool,
    /// Marks a descriptive property as opposed to the type's primary input.
    pub property: bool,
    pub required: bool,
    /// Default view for arguments bound to this parameter.
    pub view: ViewMode,
}

impl ParamDef {
    pub fn new(name: impl Into<String>) -> Self {
        ParamDef {
            name: name.into(),
            aliases: Vec::new(),
            types: Vec::new(),
            positional: false,
            property: false,
            required: false,
            view: ViewMode::Extension,
        }
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn property(mut self) -> Self {
        self.property = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn intension(mut self) -> Self {
        self.view = ViewMode::Intension;
        self
    }

    /// True if `role` is this parameter's name or one of its aliases.
    pub fn answers_to(&self, role: &str) -> bool {
        self.name == role || self.aliases.iter().any(|a| a == role)
    }
}

/// Behavioral classification of a node type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTraits {
    /// Combines other nodes; accepts any number of positional inputs.
    pub operator: bool,
    pub modifier: bool,
    /// Groups a collection of inputs.
    pub aggregator: bool,
    /// Compares a candidate value inside a constraint (`LT`, `LIKE`, ...).
    pub qualifier: bool,
    /// Set on the four scalar types.
    pub base: Option<BaseKind>,
}

/// The full declaration of a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub params: Vec<ParamDef>,
    pub traits: TypeTraits,
    /// Type name of the result this type evaluates to, when known.
    pub output_type: Option<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            params: Vec::new(),
            traits: TypeTraits::default(),
            output_type: None,
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn operator(mut self) -> Self {
        self.traits.operator = true;
        self
    }

    pub fn modifier(mut self) -> Self {
        self.traits.modifier = true;
        self
    }

    pub fn aggregator(mut self) -> Self {
        self.traits.aggregator = true;
        self
    }

    pub fn qualifier(mut self) -> Self {
        self.traits.qualifier = true;
        self
    }

    pub fn base(mut self, kind: BaseKind) -> Self {
        self.traits.base = Some(kind);
        self
    }

    pub fn output(mut self, type_name: impl Into<String>) -> Self {
        self.output_type = Some(type_name.into());
        self
    }

    pub fn is_base(&self) -> bool {
        self.traits.base.is_some()
    }

    /// Types that take inputs beyond their declared parameters.
    pub fn accepts_extra_inputs(&self) -> bool {
        self.traits.operator || self.traits.aggregator || self.is_base()
    }

    pub fn get(&self, name: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Find the parameter a role refers to, by name or alias.
    pub fn resolve_alias(&self, role: &str) -> Option<&ParamDef> {
        self.get(role)
            .or_else(|| self.params.iter().find(|p| p.answers_to(role)))
    }

    /// The `index`-th positional parameter, counting from 1.
    pub fn positional_param(&self, index: usize) -> Option<&ParamDef> {
        if index == 0 {
            return None;
        }
        self.params.iter().filter(|p| p.positional).nth(index - 1)
    }

    /// 1-based position of a positional parameter.
    pub fn positional_index(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .filter(|p| p.positional)
            .position(|p| p.name == name)
            .map(|i| i + 1)
    }
}

/// Parse the index out of an auto-generated positional role (`pos3` -> 3).
pub fn positional_role_index(role: &str) -> Option<usize> {
    let digits = role.strip_prefix("pos")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// The role name assigned to the `index`-th unnamed argument.
pub fn positional_role(index: usize) -> String {
    format!("pos{index}")
}
