//! The Cycle-Safe Cloner / Emitter (spec.md §4.6): rebuilds
//! `components.schemas` from the registry, then strips `x-origin` from the
//! whole document.
//!
//! Grounded in the teacher's `schema_registry.rs::merge_schema`/
//! `merge_inline`, which materialize a schema's own shape while replacing
//! nested registered types with references — the same "root is full, nested
//! occurrences are refs" shape this emitter produces for an untyped node.

use std::{
  collections::{HashMap, HashSet},
  rc::Rc,
};

use indexmap::IndexMap;

use crate::{
  collector,
  document::Node,
  origin_lookup,
  registry::ComponentRegistry,
  schema_walker::{ARRAY_SCHEMA_KEYWORDS, DIRECT_SCHEMA_KEYWORDS, MAP_SCHEMA_KEYWORDS},
};

pub fn emit(doc: &Node, registry: &ComponentRegistry) {
  let preexisting = existing_schema_entries(doc);
  let mut ordered: IndexMap<String, Node> = IndexMap::new();

  for (name, original) in &preexisting {
    if let Some(schema) = registry.schema_for_name(name) {
      ordered.insert(name.clone(), clone_root(schema, registry));
    } else if original.as_ref_target().is_some() {
      // A pre-existing reference-object entry never entered the registry
      // (spec.md:166: "keep as-is, rewriting its $ref if external and now
      // resolvable"); resolve it here instead of dropping the key.
      ordered.insert(name.clone(), rewrite_reference_entry(original, registry));
    }
  }
  for name in registry.names() {
    if !ordered.contains_key(name) {
      let schema = registry.schema_for_name(name).expect("name came from registry.names()");
      ordered.insert(name.to_string(), clone_root(schema, registry));
    }
  }

  let components = doc.get("components").unwrap_or_else(|| {
    let node = Node::empty_mapping();
    doc.set("components", node.clone());
    node
  });
  let schemas_map: IndexMap<String, Node> = ordered.into_iter().collect();
  components.set("schemas", Node::new_mapping(schemas_map));

  strip_origin(doc, &mut HashSet::new());
}

fn existing_schema_entries(doc: &Node) -> Vec<(String, Node)> {
  let Some(schemas) = doc.get("components").and_then(|c| c.get("schemas")) else { return Vec::new() };
  let Some(map) = schemas.as_mapping() else { return Vec::new() };
  map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Rewrites a pre-existing `components.schemas` entry that is itself a
/// reference object, using the same origin/basename resolution
/// `reference_rewriter.rs` applies to inline `$ref`s. Left verbatim if the
/// target isn't local and isn't resolvable.
fn rewrite_reference_entry(entry: &Node, registry: &ComponentRegistry) -> Node {
  let Some(target) = entry.as_ref_target() else { return entry.clone() };
  if collector::is_local_ref(&target) || !collector::is_external_origin(&target) {
    return entry.clone();
  }
  let Some(name) = origin_lookup::resolve_name(&target, |t| registry.name_by_origin(t), |b| registry.name_by_basename(b)) else {
    return entry.clone();
  };

  let rewritten = Node::empty_mapping();
  rewritten.set("$ref", Node::string(collector::local_ref(name)));
  if let Some(description) = entry.get("description") {
    rewritten.set("description", description);
  }
  if let Some(summary) = entry.get("summary") {
    rewritten.set("summary", summary);
  }
  rewritten
}

/// Materializes the root of `schema` in full, replacing any nested
/// schema-position object registered in `registry` with a local reference
/// (carrying over `description`/`summary`). Reference objects themselves are
/// kept as-is (resolution already happened in earlier passes). Identity-keyed
/// memoization makes cycles close through the in-progress placeholder and
/// ensures shared subtrees clone once.
fn clone_root(schema: &Node, registry: &ComponentRegistry) -> Node {
  let mut memo: HashMap<usize, Node> = HashMap::new();
  clone_node(schema, registry, &mut memo, true)
}

fn clone_node(node: &Node, registry: &ComponentRegistry, memo: &mut HashMap<usize, Node>, is_root: bool) -> Node {
  if !is_root
    && node.as_ref_target().is_none()
    && let Some(name) = registry.name_for_object(node)
  {
    let reference = Node::empty_mapping();
    reference.set("$ref", Node::string(collector::local_ref(name)));
    if let Some(description) = node.get("description") {
      reference.set("description", description);
    }
    if let Some(summary) = node.get("summary") {
      reference.set("summary", summary);
    }
    return reference;
  }

  match node {
    Node::Scalar(_) => node.clone(),
    Node::Sequence(seq) => {
      let id = Rc::as_ptr(seq) as usize;
      if let Some(existing) = memo.get(&id) {
        return existing.clone();
      }
      let placeholder = Node::new_sequence(Vec::new());
      memo.insert(id, placeholder.clone());

      let items: Vec<Node> = seq.borrow().iter().cloned().collect();
      let cloned: Vec<Node> = items.into_iter().map(|item| clone_node(&item, registry, memo, false)).collect();
      if let Some(target) = placeholder.as_sequence() {
        *target.borrow_mut() = cloned;
      }
      placeholder
    }
    Node::Mapping(map) => {
      let id = Rc::as_ptr(map) as usize;
      if let Some(existing) = memo.get(&id) {
        return existing.clone();
      }
      let placeholder = Node::empty_mapping();
      memo.insert(id, placeholder.clone());

      let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
      for (key, value) in entries {
        let cloned_value = if is_schema_keyword(&key) {
          clone_schema_valued(&key, &value, registry, memo)
        } else {
          clone_node(&value, registry, memo, false)
        };
        placeholder.set(&key, cloned_value);
      }
      placeholder
    }
  }
}

fn clone_schema_valued(key: &str, value: &Node, registry: &ComponentRegistry, memo: &mut HashMap<usize, Node>) -> Node {
  if DIRECT_SCHEMA_KEYWORDS.contains(&key) {
    return clone_node(value, registry, memo, false);
  }
  if ARRAY_SCHEMA_KEYWORDS.contains(&key) {
    if let Some(seq) = value.as_sequence() {
      let items: Vec<Node> = seq.borrow().iter().cloned().collect();
      return Node::new_sequence(items.into_iter().map(|item| clone_node(&item, registry, memo, false)).collect());
    }
    return clone_node(value, registry, memo, false);
  }
  if MAP_SCHEMA_KEYWORDS.contains(&key) || key == "dependencies" {
    if let Some(map) = value.as_mapping() {
      let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
      let cloned: IndexMap<String, Node> = entries.into_iter().map(|(k, v)| (k, clone_node(&v, registry, memo, false))).collect();
      return Node::new_mapping(cloned);
    }
    return clone_node(value, registry, memo, false);
  }
  clone_node(value, registry, memo, false)
}

fn is_schema_keyword(key: &str) -> bool {
  DIRECT_SCHEMA_KEYWORDS.contains(&key) || ARRAY_SCHEMA_KEYWORDS.contains(&key) || MAP_SCHEMA_KEYWORDS.contains(&key) || key == "dependencies"
}

fn strip_origin(node: &Node, seen: &mut HashSet<usize>) {
  match node {
    Node::Scalar(_) => {}
    Node::Sequence(seq) => {
      let id = Rc::as_ptr(seq) as usize;
      if !seen.insert(id) {
        return;
      }
      let items: Vec<Node> = seq.borrow().iter().cloned().collect();
      for item in &items {
        strip_origin(item, seen);
      }
    }
    Node::Mapping(map) => {
      let id = Rc::as_ptr(map) as usize;
      if !seen.insert(id) {
        return;
      }
      node.remove("x-origin");
      let children: Vec<Node> = map.borrow().values().cloned().collect();
      for child in &children {
        strip_origin(child, seen);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::collector::collect;
  use serde_json::json;

  #[test]
  fn emits_components_schemas_in_registration_order_after_existing_entries() {
    let doc = Node::from_json(json!({
      "components": {
        "schemas": {
          "Existing": {"type": "boolean"}
        }
      },
      "channels": {
        "pets": {"messages": {"petCreated": {"payload": {"type": "object", "x-origin": "./Pet.yaml"}}}}
      }
    }));
    let registry = collect(&doc);
    emit(&doc, &registry);

    let schemas = doc.get("components").unwrap().get("schemas").unwrap();
    let map = schemas.as_mapping().unwrap();
    let keys: Vec<String> = map.borrow().keys().cloned().collect();
    assert_eq!(keys, vec!["Existing".to_string(), "Pet".to_string()]);
  }

  #[test]
  fn nested_registered_schema_becomes_reference_in_emitted_root() {
    let owner = Node::from_json(json!({"type": "object", "x-origin": "./Owner.yaml"}));
    let pet = Node::empty_mapping();
    pet.set("type", Node::string("object"));
    pet.set("x-origin", Node::string("./Pet.yaml"));
    let props = Node::empty_mapping();
    props.set("owner", owner);
    pet.set("properties", props);

    let doc = Node::empty_mapping();
    let channels = Node::empty_mapping();
    let messages = Node::empty_mapping();
    let message = Node::empty_mapping();
    message.set("payload", pet);
    messages.set("petCreated", message);
    let pets = Node::empty_mapping();
    pets.set("messages", messages);
    channels.set("pets", pets);
    doc.set("channels", channels);

    let registry = collect(&doc);
    emit(&doc, &registry);

    let schemas = doc.get("components").unwrap().get("schemas").unwrap();
    let pet_out = schemas.get("Pet").unwrap();
    let owner_ref = pet_out.get("properties").unwrap().get("owner").unwrap();
    assert_eq!(owner_ref.get_str("$ref").as_deref(), Some("#/components/schemas/Owner"));
  }

  #[test]
  fn cyclic_schema_materializes_once_and_terminates() {
    let node = Node::empty_mapping();
    node.set("type", Node::string("object"));
    node.set("x-origin", Node::string("./Node.yaml"));
    let props = Node::empty_mapping();
    props.set("next", node.clone());
    node.set("properties", props);

    let doc = Node::empty_mapping();
    let channels = Node::empty_mapping();
    let messages = Node::empty_mapping();
    let message = Node::empty_mapping();
    message.set("payload", node);
    messages.set("petCreated", message);
    let pets = Node::empty_mapping();
    pets.set("messages", messages);
    channels.set("pets", pets);
    doc.set("channels", channels);

    let registry = collect(&doc);
    emit(&doc, &registry);

    let schemas = doc.get("components").unwrap().get("schemas").unwrap();
    let node_out = schemas.get("Node").unwrap();
    let next_ref = node_out.get("properties").unwrap().get("next").unwrap();
    assert_eq!(next_ref.get_str("$ref").as_deref(), Some("#/components/schemas/Node"));
  }

  #[test]
  fn preexisting_reference_object_entry_is_kept_and_resolved() {
    let doc = Node::from_json(json!({
      "components": {
        "schemas": {
          "Pet": {"type": "object", "x-origin": "./schemas/Pet.yaml"},
          "Animal": {"$ref": "./schemas/Pet.yaml"}
        }
      }
    }));
    let registry = collect(&doc);
    emit(&doc, &registry);

    let schemas = doc.get("components").unwrap().get("schemas").unwrap();
    let map = schemas.as_mapping().unwrap();
    let keys: Vec<String> = map.borrow().keys().cloned().collect();
    assert_eq!(keys, vec!["Pet".to_string(), "Animal".to_string()]);

    let animal = schemas.get("Animal").unwrap();
    assert_eq!(animal.get_str("$ref").as_deref(), Some("#/components/schemas/Pet"));
  }

  #[test]
  fn preexisting_reference_object_entry_with_unresolvable_target_is_kept_verbatim() {
    let doc = Node::from_json(json!({
      "components": {
        "schemas": {
          "Animal": {"$ref": "./schemas/Missing.yaml"}
        }
      }
    }));
    let registry = collect(&doc);
    emit(&doc, &registry);

    let animal = doc.get("components").unwrap().get("schemas").unwrap().get("Animal").unwrap();
    assert_eq!(animal.get_str("$ref").as_deref(), Some("./schemas/Missing.yaml"));
  }

  #[test]
  fn strips_x_origin_everywhere() {
    let doc = Node::from_json(json!({
      "components": {"schemas": {"Pet": {"type": "object", "x-origin": "./Pet.yaml"}}}
    }));
    let registry = collect(&doc);
    emit(&doc, &registry);
    assert!(!doc.get("components").unwrap().get("schemas").unwrap().get("Pet").unwrap().has_key("x-origin"));
  }
}
