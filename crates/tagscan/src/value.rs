//! value representation
//!
//! Every tag value, variable default and local value ends up as a [Value]:
//! - string (utf-8)
//! - number ([hcl::Number], integer or float)
//! - bool
//! - map (order-preserving, string keys)
//! - list
//! - unresolved (the raw expression text that could not be turned into a value)
//!
//! `null` has no representation of its own. A `null` default means "no default",
//! a `null` nested inside a collection is kept as `Unresolved("null")`.
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use std::fmt::{self, Display, Formatter};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(hcl::Number),
    Bool(bool),
    Map(IndexMap<String, Value>),
    List(Vec<Value>),
    Unresolved(String),
}

impl Value {
    /// Converts a literal expression without consulting any symbols.
    ///
    /// Returns `None` for `null` and for anything that needs evaluation
    /// (references, function calls, interpolating templates, ...).
    pub fn from_literal(expr: &hcl::Expression) -> Option<Value> {
        use hcl::Expression;

        match expr {
            Expression::String(s) => Some(s.as_str().into()),
            Expression::Number(num) => Some(Value::Number(num.clone())),
            Expression::Bool(b) => Some((*b).into()),
            Expression::Array(array) => array
                .iter()
                .map(Value::from_literal)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Expression::Object(object) => {
                let mut map = IndexMap::new();
                for (key, value) in object {
                    map.insert(literal_object_key(key)?, Value::from_literal(value)?);
                }
                Some(Value::Map(map))
            }
            Expression::TemplateExpr(template_expr) => {
                let template = hcl::template::Template::from_expr(template_expr).ok()?;
                let mut out = String::new();
                for element in template.elements() {
                    match element {
                        hcl::template::Element::Literal(literal) => out.push_str(literal),
                        _ => return None,
                    }
                }
                Some(out.into())
            }
            Expression::Parenthesis(inner) => Value::from_literal(inner),
            _ => None,
        }
    }

    /// String form of scalar values, as compared by tag validation
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// `true` when neither this value nor any nested value is [Value::Unresolved]
    pub fn is_fully_resolved(&self) -> bool {
        match self {
            Value::Unresolved(_) => false,
            Value::Map(map) => map.values().all(Value::is_fully_resolved),
            Value::List(list) => list.iter().all(Value::is_fully_resolved),
            _ => true,
        }
    }
}

fn literal_object_key(key: &hcl::ObjectKey) -> Option<String> {
    match key {
        hcl::ObjectKey::Identifier(ident) => Some(ident.as_str().to_string()),
        hcl::ObjectKey::Expression(expr) => Value::from_literal(expr)?.as_scalar_string(),
        _ => None,
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Unresolved(raw) => f.write_str(raw),
            Value::List(list) => {
                f.write_str("[")?;
                for (index, element) in list.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                if map.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::Map(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<hcl::Value> for Value {
    fn from(value: hcl::Value) -> Value {
        match value {
            hcl::Value::Bool(b) => b.into(),
            hcl::Value::Number(n) => Value::Number(n),
            hcl::Value::String(s) => s.into(),
            hcl::Value::Array(a) => Value::List(a.into_iter().map(Into::into).collect()),
            hcl::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            hcl::Value::Null => Value::Unresolved("null".to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match value {
            Json::Bool(b) => b.into(),
            Json::Number(n) => {
                if let Some(int) = n.as_i64() {
                    return int.into();
                }
                if let Some(uint) = n.as_u64() {
                    return Value::Number(uint.into());
                }
                n.as_f64()
                    .and_then(hcl::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::Unresolved(n.to_string()))
            }
            Json::String(s) => s.into(),
            Json::Array(a) => Value::List(a.into_iter().map(Into::into).collect()),
            Json::Object(o) => Value::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
            Json::Null => Value::Unresolved("null".to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Number(value) => value.serialize(serializer),
            Value::String(value) => serializer.serialize_str(value),
            Value::Unresolved(raw) => serializer.serialize_str(raw),
            Value::List(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Map(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}
