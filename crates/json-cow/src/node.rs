//! The shared-node tree type.
//!
//! [`Node`] is a JSON-shaped value whose composite variants hold their
//! children behind [`Rc`], so `Clone` is shallow: cloning an array or object
//! copies the vector/map of pointers and shares every child with the
//! original. This is what makes copy-on-write replay cheap and makes the
//! structural-sharing guarantee observable (`Rc::ptr_eq` on untouched
//! subtrees).

use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use std::rc::Rc;

/// A shared reference to a tree node.
pub type NodeRef = Rc<Node>;

/// A JSON-shaped tree value with shared children.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<NodeRef>),
    Object(IndexMap<String, NodeRef>),
}

impl Node {
    /// Build a shared node from a `serde_json::Value`.
    pub fn from_value(value: Value) -> NodeRef {
        Rc::new(Node::from(value))
    }

    /// Convert back into a `serde_json::Value` (deep copy).
    pub fn to_value(&self) -> Value {
        match self {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Array(items) => Value::Array(items.iter().map(|c| c.to_value()).collect()),
            Node::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }

    /// True for arrays and objects; everything else is a scalar and is
    /// never wrapped by the recorder.
    pub fn is_composite(&self) -> bool {
        matches!(self, Node::Array(_) | Node::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_array(&self) -> Option<&Vec<NodeRef>> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, NodeRef>> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Resolve a child by key: object key lookup, or canonical decimal
    /// index for arrays (`"01"` is not an index). Scalars have no children.
    pub fn get(&self, key: &str) -> Option<&NodeRef> {
        match self {
            Node::Object(map) => map.get(key),
            Node::Array(items) if json_cow_path::is_valid_index(key) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => {
                Node::Array(items.into_iter().map(|v| Rc::new(Node::from(v))).collect())
            }
            Value::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Rc::new(Node::from(v))))
                    .collect(),
            ),
        }
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        node.to_value()
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i32> for Node {
    fn from(n: i32) -> Self {
        Node::Number(Number::from(n))
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(Number::from(n))
    }
}

impl From<u64> for Node {
    fn from(n: u64) -> Self {
        Node::Number(Number::from(n))
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Node::Null, Node::Number)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
