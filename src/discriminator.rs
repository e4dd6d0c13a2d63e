//! Discriminator-Mapping Resolver and Normalizer (spec.md §4.4).
//!
//! Grounded in the teacher's `generator::converter::discriminator` module
//! (object-discriminator handling) and `schema_registry.rs`'s
//! `build_discriminator_cache`/`synthesize_implicit_mappings` for the general
//! shape of iterating a schema's discriminator mapping; the on-demand file
//! load and resolution-candidate search have no teacher counterpart and are
//! grounded directly in spec.md §4.4's own algorithm.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::{
  collector,
  document::Node,
  local_dereference,
  origin_lookup,
  registry::ComponentRegistry,
  schema_walker::{self, PathSegment, SchemaVisitor, Slot},
};

const EXTENSION_MAPPING_KEY: &str = "x-discriminator-mapping";

fn looks_like_file_reference(value: &str) -> bool {
  let lower = value.to_ascii_lowercase();
  lower.ends_with(".yaml") || lower.ends_with(".yml") || lower.ends_with(".json")
}

/// Runs the resolver loop to a fixpoint, then the normalizer over the whole
/// document (spec.md §4.4: "Repeat the whole pass until a full sweep changes
/// nothing", applied before normalization collapses discriminators).
pub async fn resolve_and_normalize(doc: &Node, registry: &mut ComponentRegistry) -> Result<(usize, usize)> {
  let mut mappings_rewritten = 0usize;
  loop {
    let mut round_changes = 0usize;
    let names: Vec<String> = registry.names().map(String::from).collect();
    for name in names {
      let Some(schema) = registry.schema_for_name(&name).cloned() else { continue };
      round_changes += resolve_one_schema(&schema, registry).await?;
    }
    mappings_rewritten += round_changes;
    if round_changes == 0 {
      break;
    }
  }

  let normalized = normalize_discriminators(doc);
  Ok((mappings_rewritten, normalized))
}

async fn resolve_one_schema(schema: &Node, registry: &mut ComponentRegistry) -> Result<usize> {
  let mut changed = 0usize;
  let origin = schema.get_str("x-origin").filter(|o| collector::is_external_origin(o));

  let mut containers: Vec<Node> = Vec::new();
  if let Some(disc) = schema.get("discriminator")
    && disc.is_mapping()
    && let Some(mapping) = disc.get("mapping")
  {
    containers.push(mapping);
  }
  if let Some(ext) = schema.get(EXTENSION_MAPPING_KEY) {
    containers.push(ext);
  }

  for container in containers {
    let Some(map) = container.as_mapping() else { continue };
    let keys: Vec<String> = map.borrow().keys().cloned().collect();
    for key in keys {
      let Some(value) = container.get_str(&key) else { continue };
      if collector::is_local_ref(&value) || !looks_like_file_reference(&value) {
        continue;
      }
      resolve_candidate(&value, origin.as_deref(), registry).await?;
      if let Some(name) = lookup(&value, origin.as_deref(), registry) {
        container.set(&key, Node::string(collector::local_ref(&name)));
        changed += 1;
      }
    }
  }

  Ok(changed)
}

fn lookup(value: &str, schema_origin: Option<&str>, registry: &ComponentRegistry) -> Option<String> {
  origin_lookup::resolve_name(value, |t| registry.name_by_origin(t), |b| registry.name_by_basename(b))
    .map(String::from)
    .or_else(|| {
      let resolved = resolved_path_candidates(value, schema_origin).into_iter().find_map(|candidate| registry.name_by_origin(&candidate).map(String::from));
      resolved
    })
}

/// Attempts to load whatever file `value` refers to, registering it (and any
/// externally-originated subtrees within it) so a subsequent `lookup` call
/// succeeds. Returns `true` if a new file was loaded this call.
async fn resolve_candidate(value: &str, schema_origin: Option<&str>, registry: &mut ComponentRegistry) -> Result<bool> {
  if origin_lookup::resolve_name(value, |t| registry.name_by_origin(t), |b| registry.name_by_basename(b)).is_some() {
    return Ok(false);
  }

  let mut candidates = resolved_path_candidates(value, schema_origin);

  if !candidates.iter().any(|c| Path::new(c).exists()) {
    let basename = origin_lookup::basename(value);
    let found = match registry.cached_search(&basename) {
      Some(cached) => cached.to_vec(),
      None => {
        let scanned = local_dereference::scan_for_basename(&basename).unwrap_or_default();
        registry.cache_search(&basename, scanned.clone());
        scanned
      }
    };

    let chosen = pick_scan_match(&found, schema_origin);
    if let Some(chosen) = chosen {
      candidates.push(chosen);
    }
  }

  let Some(resolved) = candidates.into_iter().find(|c| Path::new(c).exists()) else {
    return Ok(false);
  };

  if registry.has_attempted(&resolved) {
    return Ok(false);
  }
  registry.mark_attempted(&resolved);

  let loaded = local_dereference::load_and_dereference(&PathBuf::from(&resolved), &resolved).await?;
  registry.register(&loaded, &resolved, Some(&resolved));
  register_external_subtrees(&loaded, registry);

  Ok(true)
}

fn resolved_path_candidates(value: &str, schema_origin: Option<&str>) -> Vec<String> {
  let mut candidates = Vec::new();
  if let Some(origin) = schema_origin {
    let dir = Path::new(origin).parent().unwrap_or_else(|| Path::new(""));
    let joined = dir.join(value);
    candidates.push(origin_lookup::normalize_path(&joined.to_string_lossy()));
  }
  candidates.push(origin_lookup::normalize_path(value));
  candidates.push(origin_lookup::basename(value));
  candidates
}

fn pick_scan_match(found: &[String], schema_origin: Option<&str>) -> Option<String> {
  if found.len() == 1 {
    return Some(found[0].clone());
  }
  if let Some(origin) = schema_origin {
    let origin_dir = Path::new(origin).parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
    if !origin_dir.is_empty() {
      let matches: Vec<&String> = found.iter().filter(|f| f.contains(origin_dir.as_str())).collect();
      if matches.len() == 1 {
        return Some(matches[0].clone());
      }
    }
  }
  None
}

fn register_external_subtrees(loaded: &Node, registry: &mut ComponentRegistry) {
  struct Collect<'a> {
    registry: &'a mut ComponentRegistry,
  }
  impl SchemaVisitor for Collect<'_> {
    fn visit(&mut self, node: &Node, _slot: &Slot, _path: &[PathSegment]) -> bool {
      if node.as_ref_target().is_some() {
        return false;
      }
      if !node.is_mapping() {
        return true;
      }
      if let Some(origin) = node.get_str("x-origin")
        && collector::is_external_origin(&origin)
      {
        self.registry.register(node, &origin, Some(&origin));
      }
      false
    }
  }
  let mut path = Vec::new();
  schema_walker::walk_schema(loaded.clone(), Slot::Root, &mut path, &mut Collect { registry });
}

/// Collapses every object-shaped `discriminator` in the document to its
/// `propertyName` string, merging its `mapping` into the extension key first
/// (object-mapping wins on shared keys — see DESIGN.md's Open Question
/// resolution).
fn normalize_discriminators(doc: &Node) -> usize {
  struct Normalizer {
    count: usize,
  }
  impl SchemaVisitor for Normalizer {
    fn visit(&mut self, node: &Node, _slot: &Slot, _path: &[PathSegment]) -> bool {
      if node.as_ref_target().is_some() {
        return false;
      }
      let Some(discriminator) = node.get("discriminator") else { return false };
      if !discriminator.is_mapping() {
        return false;
      }

      if let Some(object_mapping) = discriminator.get("mapping") {
        let existing_extension = node.get(EXTENSION_MAPPING_KEY).unwrap_or_else(Node::empty_mapping);
        if let Some(map) = object_mapping.as_mapping() {
          for (key, value) in map.borrow().iter() {
            existing_extension.set(key, value.clone());
          }
        }
        node.set(EXTENSION_MAPPING_KEY, existing_extension);
      }

      match discriminator.get_str("propertyName") {
        Some(property_name) => node.set("discriminator", Node::string(property_name)),
        None => {
          node.remove("discriminator");
        }
      }

      self.count += 1;
      false
    }
  }
  let mut normalizer = Normalizer { count: 0 };
  schema_walker::walk_document(doc, &mut normalizer);
  normalizer.count
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn normalizer_collapses_object_discriminator_and_merges_mapping() {
    let doc = Node::from_json(json!({
      "components": {
        "schemas": {
          "Animal": {
            "discriminator": {
              "propertyName": "kind",
              "mapping": {"pet": "#/components/schemas/Pet", "owner": "#/components/schemas/Owner"}
            }
          }
        }
      }
    }));

    normalize_discriminators(&doc);

    let animal = doc.get("components").unwrap().get("schemas").unwrap().get("Animal").unwrap();
    assert_eq!(animal.get_str("discriminator").as_deref(), Some("kind"));
    let ext = animal.get("x-discriminator-mapping").unwrap();
    assert_eq!(ext.get_str("pet").as_deref(), Some("#/components/schemas/Pet"));
    assert_eq!(ext.get_str("owner").as_deref(), Some("#/components/schemas/Owner"));
  }

  #[test]
  fn object_mapping_overwrites_extension_on_shared_keys() {
    let doc = Node::from_json(json!({
      "components": {
        "schemas": {
          "Animal": {
            "x-discriminator-mapping": {"pet": "#/components/schemas/Stale"},
            "discriminator": {
              "propertyName": "kind",
              "mapping": {"pet": "#/components/schemas/Pet"}
            }
          }
        }
      }
    }));

    normalize_discriminators(&doc);

    let animal = doc.get("components").unwrap().get("schemas").unwrap().get("Animal").unwrap();
    let ext = animal.get("x-discriminator-mapping").unwrap();
    assert_eq!(ext.get_str("pet").as_deref(), Some("#/components/schemas/Pet"));
  }

  #[test]
  fn discriminator_without_property_name_is_removed() {
    let doc = Node::from_json(json!({
      "components": {"schemas": {"Animal": {"discriminator": {"mapping": {}}}}}
    }));
    normalize_discriminators(&doc);
    let animal = doc.get("components").unwrap().get("schemas").unwrap().get("Animal").unwrap();
    assert!(!animal.has_key("discriminator"));
  }
}
