//! The Collector pass (spec.md §4.2): pre-seed from `components.schemas`,
//! then walk the document registering every externally-originated or
//! root-positioned inline schema.
//!
//! Grounded in `schema_registry.rs::SchemaRegistry::new`, which pre-seeds its
//! registry from the spec's existing component schemas before the discovery
//! walk begins.

use crate::{
  document::Node,
  metrics::NormalizationWarning,
  registry::ComponentRegistry,
  schema_walker::{self, PathSegment, SchemaVisitor, Slot},
};

const LOCAL_PREFIX: &str = "#/components/schemas/";

pub fn is_external_origin(origin: &str) -> bool {
  !origin.starts_with('#')
}

/// Runs the full Collector pass over `doc`, returning a populated registry.
/// Malformed schema content (spec.md §7: "non-mapping where a mapping is
/// required") is skipped silently — use [`collect_with_warnings`] to observe
/// those soft failures.
pub fn collect(doc: &Node) -> ComponentRegistry {
  collect_with_warnings(doc).0
}

/// Same as [`collect`], but also returns the soft-failure warnings recorded
/// along the way.
pub fn collect_with_warnings(doc: &Node) -> (ComponentRegistry, Vec<NormalizationWarning>) {
  let mut registry = ComponentRegistry::new();
  seed_existing_schemas(doc, &mut registry);

  let mut warnings = Vec::new();
  let mut visitor = CollectorVisitor { registry: &mut registry, warnings: &mut warnings };
  schema_walker::walk_document(doc, &mut visitor);

  (registry, warnings)
}

fn seed_existing_schemas(doc: &Node, registry: &mut ComponentRegistry) {
  let Some(schemas) = doc.get("components").and_then(|c| c.get("schemas")) else { return };
  let Some(map) = schemas.as_mapping() else { return };
  let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  for (name, schema) in entries {
    if schema.as_ref_target().is_some() {
      // Reference objects are kept as-is and resolved by the emitter
      // (spec.md:166), not registered as schemas in their own right.
      continue;
    }
    let origin = schema.get_str("x-origin").filter(|o| is_external_origin(o));
    registry.seed_existing(&name, schema, origin.as_deref());
  }
}

struct CollectorVisitor<'a> {
  registry: &'a mut ComponentRegistry,
  warnings: &'a mut Vec<NormalizationWarning>,
}

impl SchemaVisitor for CollectorVisitor<'_> {
  fn visit(&mut self, node: &Node, _slot: &Slot, path: &[PathSegment]) -> bool {
    if node.as_ref_target().is_some() {
      return false;
    }

    if !node.is_mapping() {
      if is_dependencies_member(path) {
        // A `dependencies` entry may be a property-name array or a boolean
        // schema instead of a mapping (JSON Schema "property dependencies");
        // not malformed.
        return true;
      }
      // Malformed schema content: not a mapping where one is required. Soft
      // failure per spec.md §7 — skip this node.
      let at = path.iter().map(path_segment_label).collect::<Vec<_>>().join("/");
      self.warnings.push(NormalizationWarning::MalformedSchemaContent { path: at });
      return true;
    }

    if let Some(name) = schema_walker::components_schema_root_name(path) {
      // Already seeded by seed_existing_schemas; re-registering here would be
      // a duplicate identity registration, which register() already handles
      // as a no-op, but we skip it to avoid re-deriving a name.
      if self.registry.name_for_object(node).is_none() {
        self.registry.register(node, name, None);
      }
      return false;
    }

    if let Some(origin) = node.get_str("x-origin") {
      if is_external_origin(&origin) {
        self.registry.register(node, &origin, Some(&origin));
      }
    }

    false
  }
}

fn is_dependencies_member(path: &[PathSegment]) -> bool {
  path.len() >= 2 && matches!(&path[path.len() - 2], PathSegment::Key(key) if key == "dependencies")
}

fn path_segment_label(segment: &PathSegment) -> String {
  match segment {
    PathSegment::Key(key) => key.clone(),
    PathSegment::Index(index) => index.to_string(),
  }
}

pub fn local_ref(name: &str) -> String {
  format!("{LOCAL_PREFIX}{name}")
}

pub fn is_local_ref(value: &str) -> bool {
  value.starts_with(LOCAL_PREFIX)
}

pub fn name_from_local_ref(value: &str) -> Option<&str> {
  value.strip_prefix(LOCAL_PREFIX)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn pre_existing_component_schema_is_registered_under_its_key() {
    let doc = Node::from_json(json!({
      "components": {"schemas": {"Pet": {"type": "object"}}}
    }));
    let registry = collect(&doc);
    assert!(registry.contains_name("Pet"));
  }

  #[test]
  fn external_origin_inline_schema_is_registered() {
    let doc = Node::from_json(json!({
      "channels": {
        "pets": {
          "messages": {
            "petCreated": {
              "payload": {"type": "object", "x-origin": "./schemas/Pet.yaml"}
            }
          }
        }
      }
    }));
    let registry = collect(&doc);
    assert_eq!(registry.len(), 1);
    assert!(registry.name_by_origin("./schemas/Pet.yaml").is_some());
  }

  #[test]
  fn internal_origin_is_not_treated_as_external() {
    let doc = Node::from_json(json!({
      "channels": {
        "pets": {
          "messages": {
            "petCreated": {
              "payload": {"type": "object", "x-origin": "#/components/schemas/Pet"}
            }
          }
        }
      }
    }));
    let registry = collect(&doc);
    assert!(registry.is_empty());
  }

  #[test]
  fn reference_objects_are_not_registered() {
    let doc = Node::from_json(json!({
      "components": {"schemas": {"Pet": {"$ref": "#/components/schemas/Animal"}}}
    }));
    let registry = collect(&doc);
    assert!(registry.is_empty());
  }

  #[test]
  fn non_mapping_schema_content_is_skipped_with_a_warning() {
    let doc = Node::from_json(json!({
      "channels": {"pets": {"messages": {"petCreated": {"payload": "not-a-schema"}}}}
    }));
    let (registry, warnings) = collect_with_warnings(&doc);
    assert!(registry.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(&warnings[0], NormalizationWarning::MalformedSchemaContent { .. }));
  }

  #[test]
  fn boolean_dependencies_entry_does_not_warn() {
    let doc = Node::from_json(json!({
      "components": {
        "schemas": {
          "Pet": {"type": "object", "dependencies": {"a": true}}
        }
      }
    }));
    let (_registry, warnings) = collect_with_warnings(&doc);
    assert!(warnings.is_empty());
  }
}
