//! The two traversal primitives of spec.md §4.1: the *document walk*, which
//! finds schema entry points anywhere in the tree, and the *schema walk*,
//! which descends from a schema root following only the keywords that are
//! schema-shaped.
//!
//! Grounded in the teacher's `utils::schema_ext::SchemaExt` trait, which
//! enumerates exactly this kind of keyword-shape predicate over
//! `ObjectSchema`; here the same classification is generalized from typed
//! struct fields to untyped mapping keys, since the document is a raw tree
//! rather than a deserialized `ObjectSchema`.

use std::collections::HashSet;

use crate::document::{Mapping, Node, Sequence};

pub(crate) const DIRECT_SCHEMA_KEYWORDS: &[&str] = &[
  "schema",
  "payload",
  "headers",
  "items",
  "additionalItems",
  "contains",
  "additionalProperties",
  "propertyNames",
  "if",
  "then",
  "else",
  "not",
  "unevaluatedItems",
  "unevaluatedProperties",
];

pub(crate) const ARRAY_SCHEMA_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

pub(crate) const MAP_SCHEMA_KEYWORDS: &[&str] = &["properties", "patternProperties", "definitions", "$defs", "dependentSchemas"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
  Key(String),
  Index(usize),
}

/// The parent slot a schema node currently occupies — where the rewriter and
/// emitter insert a replacement value.
#[derive(Clone)]
pub enum Slot {
  Map(Mapping, String),
  Seq(Sequence, usize),
  Root,
}

impl Slot {
  pub fn set(&self, node: Node) {
    match self {
      Slot::Map(map, key) => {
        map.borrow_mut().insert(key.clone(), node);
      }
      Slot::Seq(seq, index) => {
        if let Some(slot) = seq.borrow_mut().get_mut(*index) {
          *slot = node;
        }
      }
      Slot::Root => {}
    }
  }
}

/// Returns `true` to skip descending into the subtree rooted at this node.
pub trait SchemaVisitor {
  fn visit(&mut self, node: &Node, slot: &Slot, path: &[PathSegment]) -> bool;
}

/// Walks the whole document, handing every schema entry point to the schema
/// walk. Does not itself descend into schema contents — that is the schema
/// walk's job, with its own (narrower) keyword rules.
pub fn walk_document(doc: &Node, visitor: &mut dyn SchemaVisitor) {
  let mut ancestors = HashSet::new();
  let mut path = Vec::new();
  walk_document_node(doc.clone(), &mut path, &mut ancestors, visitor);
}

fn walk_document_node(node: Node, path: &mut Vec<PathSegment>, ancestors: &mut HashSet<usize>, visitor: &mut dyn SchemaVisitor) {
  if let Some(id) = node.identity() {
    if !ancestors.insert(id) {
      return;
    }
  }

  match &node {
    Node::Mapping(map) => {
      let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
      for (key, value) in entries {
        if key == "schemas" && path_is_components(path) {
          path.push(PathSegment::Key(key));
          walk_components_schemas(&value, path, visitor);
          path.pop();
          continue;
        }
        if is_schema_entry_point(&key, path) {
          path.push(PathSegment::Key(key.clone()));
          let mut root_ancestors = HashSet::new();
          walk_schema_node(value, Slot::Map(map.clone(), key), path, &mut root_ancestors, visitor);
          path.pop();
          continue;
        }
        path.push(PathSegment::Key(key));
        walk_document_node(value, path, ancestors, visitor);
        path.pop();
      }
    }
    Node::Sequence(seq) => {
      let items: Vec<Node> = seq.borrow().iter().cloned().collect();
      for (index, item) in items.into_iter().enumerate() {
        path.push(PathSegment::Index(index));
        walk_document_node(item, path, ancestors, visitor);
        path.pop();
      }
    }
    Node::Scalar(_) => {}
  }

  if let Some(id) = node.identity() {
    ancestors.remove(&id);
  }
}

fn walk_components_schemas(schemas_value: &Node, path: &mut Vec<PathSegment>, visitor: &mut dyn SchemaVisitor) {
  let Some(map) = schemas_value.as_mapping() else { return };
  let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  for (name, schema) in entries {
    path.push(PathSegment::Key(name.clone()));
    let mut root_ancestors = HashSet::new();
    walk_schema_node(schema, Slot::Map(map.clone(), name), path, &mut root_ancestors, visitor);
    path.pop();
  }
}

fn path_is_components(path: &[PathSegment]) -> bool {
  path.len() == 1 && path[0] == PathSegment::Key("components".to_string())
}

fn is_schema_entry_point(key: &str, path: &[PathSegment]) -> bool {
  match key {
    "schema" => true,
    "payload" | "headers" => !path_contains_key(path, "examples"),
    _ => false,
  }
}

fn path_contains_key(path: &[PathSegment], key: &str) -> bool {
  path.iter().any(|seg| matches!(seg, PathSegment::Key(k) if k == key))
}

/// Returns `Some(name)` iff `path` is exactly `["components", "schemas", name]`.
pub fn components_schema_root_name(path: &[PathSegment]) -> Option<&str> {
  match path {
    [PathSegment::Key(a), PathSegment::Key(b), PathSegment::Key(name)] if a == "components" && b == "schemas" => Some(name),
    _ => None,
  }
}

/// Walks from a schema root, descending only through schema-shaped keywords.
pub fn walk_schema(root: Node, slot: Slot, path: &mut Vec<PathSegment>, visitor: &mut dyn SchemaVisitor) {
  let mut ancestors = HashSet::new();
  walk_schema_node(root, slot, path, &mut ancestors, visitor);
}

fn walk_schema_node(node: Node, slot: Slot, path: &mut Vec<PathSegment>, ancestors: &mut HashSet<usize>, visitor: &mut dyn SchemaVisitor) {
  if let Some(id) = node.identity() {
    if ancestors.contains(&id) {
      return;
    }
  }

  if visitor.visit(&node, &slot, path) {
    return;
  }

  let id = node.identity();
  if let Some(id) = id {
    ancestors.insert(id);
  }

  if let Some(map) = node.as_mapping() {
    let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    for (key, value) in entries {
      if DIRECT_SCHEMA_KEYWORDS.contains(&key.as_str()) {
        path.push(PathSegment::Key(key.clone()));
        walk_schema_node(value, Slot::Map(map.clone(), key), path, ancestors, visitor);
        path.pop();
      } else if ARRAY_SCHEMA_KEYWORDS.contains(&key.as_str()) {
        if let Some(seq) = value.as_sequence() {
          let items: Vec<Node> = seq.borrow().iter().cloned().collect();
          path.push(PathSegment::Key(key.clone()));
          for (index, item) in items.into_iter().enumerate() {
            path.push(PathSegment::Index(index));
            walk_schema_node(item, Slot::Seq(seq.clone(), index), path, ancestors, visitor);
            path.pop();
          }
          path.pop();
        }
      } else if MAP_SCHEMA_KEYWORDS.contains(&key.as_str()) {
        descend_map_of_schemas(&key, &value, path, ancestors, visitor);
      } else if key == "dependencies" {
        descend_map_of_schemas(&key, &value, path, ancestors, visitor);
      }
    }
  }

  if let Some(id) = id {
    ancestors.remove(&id);
  }
}

fn descend_map_of_schemas(key: &str, value: &Node, path: &mut Vec<PathSegment>, ancestors: &mut HashSet<usize>, visitor: &mut dyn SchemaVisitor) {
  let Some(sub_map) = value.as_mapping() else { return };
  let entries: Vec<(String, Node)> = sub_map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  path.push(PathSegment::Key(key.to_string()));
  for (name, child) in entries {
    path.push(PathSegment::Key(name.clone()));
    walk_schema_node(child, Slot::Map(sub_map.clone(), name), path, ancestors, visitor);
    path.pop();
  }
  path.pop();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::document::Node;

  struct Collecting {
    paths: Vec<Vec<PathSegment>>,
  }

  impl SchemaVisitor for Collecting {
    fn visit(&mut self, _node: &Node, _slot: &Slot, path: &[PathSegment]) -> bool {
      self.paths.push(path.to_vec());
      false
    }
  }

  #[test]
  fn finds_payload_outside_examples_only() {
    let doc = Node::from_json(serde_json::json!({
      "channels": {
        "pets": {
          "messages": {
            "petCreated": {
              "payload": {"type": "object"},
              "examples": [{"payload": {"type": "string"}}]
            }
          }
        }
      }
    }));

    let mut visitor = Collecting { paths: Vec::new() };
    walk_document(&doc, &mut visitor);

    let payload_roots: Vec<_> = visitor
      .paths
      .iter()
      .filter(|p| matches!(p.last(), Some(PathSegment::Key(k)) if k == "payload"))
      .collect();
    assert_eq!(payload_roots.len(), 1);
  }

  #[test]
  fn schema_walk_descends_allof_properties_and_items() {
    let doc = Node::from_json(serde_json::json!({
      "components": {
        "schemas": {
          "Bag": {
            "allOf": [{"properties": {"owner": {"type": "string"}}}],
            "properties": {"items": {"type": "array", "items": {"type": "integer"}}}
          }
        }
      }
    }));

    let mut visitor = Collecting { paths: Vec::new() };
    walk_document(&doc, &mut visitor);
    assert!(visitor.paths.len() > 1, "expected nested schema positions to be visited");
  }

  #[test]
  fn cycle_does_not_loop_forever() {
    let node = Node::empty_mapping();
    let props = Node::empty_mapping();
    props.set("next", node.clone());
    node.set("properties", props);

    struct NoOp;
    impl SchemaVisitor for NoOp {
      fn visit(&mut self, _n: &Node, _s: &Slot, _p: &[PathSegment]) -> bool {
        false
      }
    }
    let mut path = Vec::new();
    walk_schema(node, Slot::Root, &mut path, &mut NoOp);
  }
}
