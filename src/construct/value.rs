//! Property values, including deferred references to other nodes

use std::collections::BTreeMap;

use super::node::NodeId;

/// Pseudo parameters provided by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    Region,
    UrlSuffix,
    Partition,
    AccountId,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pseudo::Region => "AWS::Region",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::AccountId => "AWS::AccountId",
        }
    }
}

/// A property value
///
/// `Ref` and `GetAtt` point at nodes and are only turned into logical ids
/// during synthesis, so a value may name a node whose final id is not yet
/// known when the value is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Ref(NodeId),
    GetAtt(NodeId, String),
    Pseudo(Pseudo),
    Join(String, Vec<Value>),
}

impl Value {
    pub fn reference(target: NodeId) -> Self {
        Value::Ref(target)
    }

    pub fn get_att(target: NodeId, attribute: impl Into<String>) -> Self {
        Value::GetAtt(target, attribute.into())
    }

    pub fn join(separator: impl Into<String>, parts: Vec<Value>) -> Self {
        Value::Join(separator.into(), parts)
    }

    /// True if this value, or anything nested in it, is a node reference
    pub fn has_references(&self) -> bool {
        match self {
            Value::Ref(_) | Value::GetAtt(..) => true,
            Value::List(items) | Value::Join(_, items) => items.iter().any(Value::has_references),
            Value::Map(map) => map.values().any(Value::has_references),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Pseudo> for Value {
    fn from(p: Pseudo) -> Self {
        Value::Pseudo(p)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Properties> for Value {
    fn from(props: Properties) -> Self {
        Value::Map(props.0)
    }
}

/// An ordered property bag keyed by engine property name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property only when a value is present; `None` means unset
    pub fn with_opt<V: Into<Value>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.set(key, v);
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Append to a list property, creating it if missing
    ///
    /// Returns false if the property exists but is not a list.
    pub fn push(&mut self, key: &str, value: impl Into<Value>) -> bool {
        match self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(items) => {
                items.push(value.into());
                true
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}
