//! Parameter kinds, values, and definitions.
//!
//! Parameters are the lightweight per-node configuration values set at load
//! time or through the control plane. They are not buffered and not
//! automatable; anything block-rate travels through a Control port instead.

/// The kind of value a parameter accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Float,
    Int,
    Bool,
    Text,
}

impl ParamKind {
    /// Returns a short lowercase name, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::Float => "float",
            ParamKind::Int => "int",
            ParamKind::Bool => "bool",
            ParamKind::Text => "text",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }

    /// Parses a literal against a declared kind.
    ///
    /// Returns None when the literal does not parse as that kind. Text
    /// always parses (the raw literal is kept verbatim).
    pub fn parse_as(kind: ParamKind, text: &str) -> Option<ParamValue> {
        match kind {
            ParamKind::Float => text.trim().parse::<f64>().ok().map(ParamValue::Float),
            ParamKind::Int => text.trim().parse::<i64>().ok().map(ParamValue::Int),
            ParamKind::Bool => text.trim().parse::<bool>().ok().map(ParamValue::Bool),
            ParamKind::Text => Some(ParamValue::Text(text.to_string())),
        }
    }

    /// Parses a literal with no declared kind, inferring the narrowest type.
    ///
    /// Tried in order: int, float, bool, then text.
    pub fn infer(text: &str) -> ParamValue {
        let trimmed = text.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return ParamValue::Float(f);
        }
        if let Ok(b) = trimmed.parse::<bool>() {
            return ParamValue::Bool(b);
        }
        ParamValue::Text(text.to_string())
    }

    /// Converts to f32 for use inside processors.
    ///
    /// Int and Bool coerce numerically; Text yields 0.0.
    pub fn as_f32(&self) -> f32 {
        match self {
            ParamValue::Float(f) => *f as f32,
            ParamValue::Int(i) => *i as f32,
            ParamValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ParamValue::Text(_) => 0.0,
        }
    }

    /// Converts to i64, truncating floats. Text yields 0.
    pub fn as_i64(&self) -> i64 {
        match self {
            ParamValue::Float(f) => *f as i64,
            ParamValue::Int(i) => *i,
            ParamValue::Bool(b) => i64::from(*b),
            ParamValue::Text(_) => 0,
        }
    }

    /// Converts to bool; numeric values are true when nonzero.
    pub fn as_bool(&self) -> bool {
        match self {
            ParamValue::Float(f) => *f != 0.0,
            ParamValue::Int(i) => *i != 0,
            ParamValue::Bool(b) => *b,
            ParamValue::Text(_) => false,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// Definition of a parameter on a node type.
#[derive(Clone, Debug)]
pub struct ParameterDefinition {
    /// Stable identifier within the node type; the name used in patch text.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// The kind of value this parameter accepts.
    pub kind: ParamKind,
    /// Default value when the node is created.
    pub default: ParamValue,
}

impl ParameterDefinition {
    /// Creates a float parameter.
    pub fn float(id: &'static str, name: &'static str, default: f64) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
        }
    }

    /// Creates an integer parameter.
    pub fn int(id: &'static str, name: &'static str, default: i64) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Int,
            default: ParamValue::Int(default),
        }
    }

    /// Creates a boolean parameter.
    pub fn toggle(id: &'static str, name: &'static str, default: bool) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Bool,
            default: ParamValue::Bool(default),
        }
    }

    /// Creates a text parameter.
    pub fn text(id: &'static str, name: &'static str, default: &str) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Text,
            default: ParamValue::Text(default.to_string()),
        }
    }
}
