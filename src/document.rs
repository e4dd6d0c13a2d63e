//! The in-memory document tree this crate operates on.
//!
//! Unlike the teacher's typed `oas3::ObjectSchema`, an AsyncAPI document here
//! is an untyped tree of mappings, sequences and scalars that may alias or
//! cycle — the resolver that produced it is free to point two positions at
//! the very same mapping. `Node` models that directly with `Rc<RefCell<..>>`
//! so object identity (not structural equality) is observable and cheap to
//! key a map on.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use indexmap::IndexMap;
use serde_json::{Number, Value};

pub type Mapping = Rc<RefCell<IndexMap<String, Node>>>;
pub type Sequence = Rc<RefCell<Vec<Node>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  Null,
  Bool(bool),
  Number(Number),
  String(String),
}

#[derive(Debug, Clone)]
pub enum Node {
  Mapping(Mapping),
  Sequence(Sequence),
  Scalar(Scalar),
}

impl Node {
  pub fn new_mapping(map: IndexMap<String, Node>) -> Node {
    Node::Mapping(Rc::new(RefCell::new(map)))
  }

  pub fn empty_mapping() -> Node {
    Node::new_mapping(IndexMap::new())
  }

  pub fn new_sequence(items: Vec<Node>) -> Node {
    Node::Sequence(Rc::new(RefCell::new(items)))
  }

  pub fn string(s: impl Into<String>) -> Node {
    Node::Scalar(Scalar::String(s.into()))
  }

  pub fn bool(b: bool) -> Node {
    Node::Scalar(Scalar::Bool(b))
  }

  /// Identity of the underlying `Rc` allocation, used as a registry key.
  /// `None` for scalars: they carry no shared identity worth tracking.
  pub fn identity(&self) -> Option<usize> {
    match self {
      Node::Mapping(m) => Some(Rc::as_ptr(m) as usize),
      Node::Sequence(s) => Some(Rc::as_ptr(s) as usize),
      Node::Scalar(_) => None,
    }
  }

  pub fn as_mapping(&self) -> Option<&Mapping> {
    match self {
      Node::Mapping(m) => Some(m),
      _ => None,
    }
  }

  pub fn as_sequence(&self) -> Option<&Sequence> {
    match self {
      Node::Sequence(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Node::Scalar(Scalar::String(s)) => Some(s.as_str()),
      _ => None,
    }
  }

  pub fn is_mapping(&self) -> bool {
    matches!(self, Node::Mapping(_))
  }

  /// Returns a clone of the child at `key`, if this is a mapping and has one.
  /// Cloning a `Node` only bumps an `Rc` refcount; it never deep-copies.
  pub fn get(&self, key: &str) -> Option<Node> {
    self.as_mapping()?.borrow().get(key).cloned()
  }

  pub fn get_str(&self, key: &str) -> Option<String> {
    self.get(key).and_then(|n| n.as_str().map(String::from))
  }

  pub fn set(&self, key: &str, value: Node) {
    if let Some(m) = self.as_mapping() {
      m.borrow_mut().insert(key.to_string(), value);
    }
  }

  pub fn remove(&self, key: &str) -> Option<Node> {
    self.as_mapping()?.borrow_mut().shift_remove(key)
  }

  pub fn has_key(&self, key: &str) -> bool {
    self.as_mapping().is_some_and(|m| m.borrow().contains_key(key))
  }

  /// `$ref`-shaped schema: a mapping whose only key is `$ref` with a string value.
  pub fn as_ref_target(&self) -> Option<String> {
    let map = self.as_mapping()?;
    let borrowed = map.borrow();
    if borrowed.len() != 1 {
      return None;
    }
    match borrowed.get("$ref") {
      Some(Node::Scalar(Scalar::String(s))) => Some(s.clone()),
      _ => None,
    }
  }

  pub fn from_json(value: Value) -> Node {
    match value {
      Value::Null => Node::Scalar(Scalar::Null),
      Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
      Value::Number(n) => Node::Scalar(Scalar::Number(n)),
      Value::String(s) => Node::Scalar(Scalar::String(s)),
      Value::Array(items) => Node::new_sequence(items.into_iter().map(Node::from_json).collect()),
      Value::Object(map) => {
        let mapping = map.into_iter().map(|(k, v)| (k, Node::from_json(v))).collect();
        Node::new_mapping(mapping)
      }
    }
  }

  /// Renders the node back to a `serde_json::Value` tree, guarding against
  /// cycles (which should not survive a completed pipeline, but a defensive
  /// guard here keeps a malformed intermediate state from hanging the CLI).
  pub fn to_json(&self) -> Value {
    let mut ancestors = HashSet::new();
    self.to_json_guarded(&mut ancestors)
  }

  fn to_json_guarded(&self, ancestors: &mut HashSet<usize>) -> Value {
    match self {
      Node::Scalar(Scalar::Null) => Value::Null,
      Node::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
      Node::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
      Node::Scalar(Scalar::String(s)) => Value::String(s.clone()),
      Node::Sequence(seq) => Value::Array(seq.borrow().iter().map(|n| n.to_json_guarded(ancestors)).collect()),
      Node::Mapping(map) => {
        let id = Rc::as_ptr(map) as usize;
        if !ancestors.insert(id) {
          return Value::Bool(false);
        }
        let value = Value::Object(
          map
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json_guarded(ancestors)))
            .collect(),
        );
        ancestors.remove(&id);
        value
      }
    }
  }
}
