//! The component registry (spec.md §3) and `registerSchema` (spec.md §4.2).
//!
//! Grounded in the teacher's `generator::schema_registry::SchemaRegistry`: a
//! single mutable registry object built once and threaded through the whole
//! pipeline, exposing `get`/`contains`/name accessors rather than leaking its
//! internal maps.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::{document::Node, fingerprint::fingerprint, naming};

#[derive(Debug, Default)]
pub struct ComponentRegistry {
  object_to_name: HashMap<usize, String>,
  name_to_schema: IndexMap<String, Node>,
  signature_to_name: HashMap<String, String>,
  origin_to_name: HashMap<String, String>,
  basename_to_name: HashMap<String, String>,
  ambiguous_basenames: HashSet<String>,
  attempted_loads: HashSet<String>,
  file_search_cache: HashMap<String, Vec<String>>,
}

impl ComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn name_for_object(&self, schema: &Node) -> Option<&str> {
    let id = schema.identity()?;
    self.object_to_name.get(&id).map(String::as_str)
  }

  pub fn schema_for_name(&self, name: &str) -> Option<&Node> {
    self.name_to_schema.get(name)
  }

  pub fn contains_name(&self, name: &str) -> bool {
    self.name_to_schema.contains_key(name)
  }

  pub fn name_by_origin(&self, origin: &str) -> Option<&str> {
    self.origin_to_name.get(origin).map(String::as_str)
  }

  pub fn name_by_basename(&self, basename: &str) -> Option<&str> {
    if self.ambiguous_basenames.contains(basename) {
      return None;
    }
    self.basename_to_name.get(basename).map(String::as_str)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.name_to_schema.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
    self.name_to_schema.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.name_to_schema.len()
  }

  pub fn is_empty(&self) -> bool {
    self.name_to_schema.is_empty()
  }

  pub fn has_attempted(&self, origin: &str) -> bool {
    self.attempted_loads.contains(origin)
  }

  pub fn mark_attempted(&mut self, origin: &str) {
    self.attempted_loads.insert(origin.to_string());
  }

  pub fn cached_search(&self, basename: &str) -> Option<&[String]> {
    self.file_search_cache.get(basename).map(Vec::as_slice)
  }

  pub fn cache_search(&mut self, basename: &str, matches: Vec<String>) {
    self.file_search_cache.insert(basename.to_string(), matches);
  }

  /// Pre-seeds a `components.schemas` entry under a fixed name without going
  /// through name derivation (step "pre-existing entries, preserving their
  /// position" in the Collector, spec.md §4.2). `origin`, when the entry
  /// carries an `x-origin`, is recorded the same way `register()` records it
  /// for a freshly-discovered schema, so a later `$ref` pointing at the same
  /// origin resolves to this name instead of triggering a fresh load.
  pub fn seed_existing(&mut self, name: &str, schema: Node, origin: Option<&str>) {
    if let Some(id) = schema.identity() {
      self.object_to_name.insert(id, name.to_string());
      let sig = format!("{}::{}", normalized_base_name(name), fingerprint(&schema));
      self.signature_to_name.insert(sig, name.to_string());
    }
    self.record_origin_and_basename(origin, name);
    self.name_to_schema.insert(name.to_string(), schema);
  }

  /// Implements `registerSchema` exactly per spec.md §4.2.
  pub fn register(&mut self, schema: &Node, suggested_name: &str, origin_path: Option<&str>) -> String {
    let id = schema.identity();

    // 1. Already registered by identity.
    if let Some(id) = id
      && let Some(existing) = self.object_to_name.get(&id)
    {
      return existing.clone();
    }

    // 2. Known origin binds directly.
    if let Some(origin) = origin_path
      && let Some(existing) = self.origin_to_name.get(origin).cloned()
    {
      if let Some(id) = id {
        self.object_to_name.insert(id, existing.clone());
      }
      return existing;
    }

    let safe_name = naming::derive_name(suggested_name);
    let fp = fingerprint(schema);
    let sig = format!("{}::{}", normalized_base_name(&safe_name), fp);

    // 3. Exact duplicate by signature: alias to the existing name.
    if let Some(existing) = self.signature_to_name.get(&sig).cloned() {
      if let Some(id) = id {
        self.object_to_name.insert(id, existing.clone());
      }
      self.record_origin_and_basename(origin_path, &existing);
      return existing;
    }

    // 4. Fresh registration: find the smallest free (or identity-matching) suffix.
    let unique_name = self.ensure_unique(&safe_name, schema);

    if let Some(id) = id {
      self.object_to_name.insert(id, unique_name.clone());
    }
    self.signature_to_name.insert(sig, unique_name.clone());
    self.record_origin_and_basename(origin_path, &unique_name);
    self.name_to_schema.insert(unique_name.clone(), schema.clone());

    unique_name
  }

  fn record_origin_and_basename(&mut self, origin_path: Option<&str>, name: &str) {
    let Some(origin) = origin_path else { return };
    self.origin_to_name.insert(origin.to_string(), name.to_string());

    let basename = naming::basename(origin);
    match self.basename_to_name.get(&basename) {
      None => {
        self.basename_to_name.insert(basename, name.to_string());
      }
      Some(existing) if existing != name => {
        self.ambiguous_basenames.insert(basename);
      }
      _ => {}
    }
  }

  fn ensure_unique(&self, safe_name: &str, schema: &Node) -> String {
    if !self.name_to_schema.contains_key(safe_name) {
      return safe_name.to_string();
    }
    if self.same_identity(safe_name, schema) {
      return safe_name.to_string();
    }

    let mut k = 2usize;
    loop {
      let candidate = format!("{safe_name}_{k}");
      if !self.name_to_schema.contains_key(&candidate) || self.same_identity(&candidate, schema) {
        return candidate;
      }
      k += 1;
    }
  }

  fn same_identity(&self, name: &str, schema: &Node) -> bool {
    let Some(existing) = self.name_to_schema.get(name) else { return false };
    match (existing.identity(), schema.identity()) {
      (Some(a), Some(b)) => a == b,
      _ => false,
    }
  }

  /// Rebinds every reference to `alias` onto `canonical`, used by the alias
  /// consolidator (spec.md §4.5). Does not touch document references — that
  /// is the caller's job; this only updates registry bookkeeping.
  pub fn rebind_alias(&mut self, alias: &str, canonical: &str) {
    for value in self.object_to_name.values_mut() {
      if value == alias {
        *value = canonical.to_string();
      }
    }
    for value in self.origin_to_name.values_mut() {
      if value == alias {
        *value = canonical.to_string();
      }
    }
    for value in self.basename_to_name.values_mut() {
      if value == alias {
        *value = canonical.to_string();
      }
    }
    self.name_to_schema.shift_remove(alias);
  }

  pub fn rebuild_signatures(&mut self) {
    self.signature_to_name.clear();
    let entries: Vec<(String, Node)> = self.name_to_schema.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    for (name, schema) in entries {
      let sig = format!("{}::{}", normalized_base_name(&name), fingerprint(&schema));
      self.signature_to_name.insert(sig, name);
    }
  }
}

/// Base name with any trailing `_<digits>` collision suffix stripped, used to
/// group registrations that derive from the same logical name.
pub fn normalized_base_name(name: &str) -> String {
  match name.rfind('_') {
    Some(idx) if name[idx + 1..].chars().all(|c| c.is_ascii_digit()) && !name[idx + 1..].is_empty() => name[..idx].to_string(),
    _ => name.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn registers_fresh_schema_under_derived_name() {
    let mut registry = ComponentRegistry::new();
    let schema = Node::from_json(json!({"type": "string"}));
    let name = registry.register(&schema, "./schemas/Pet.yaml", Some("./schemas/Pet.yaml"));
    assert_eq!(name, "Pet");
    assert!(registry.contains_name("Pet"));
  }

  #[test]
  fn reregistering_same_object_returns_same_name() {
    let mut registry = ComponentRegistry::new();
    let schema = Node::from_json(json!({"type": "string"}));
    let first = registry.register(&schema, "Pet", None);
    let second = registry.register(&schema, "Pet", None);
    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn equivalent_schema_from_new_object_aliases_existing_name() {
    let mut registry = ComponentRegistry::new();
    let a = Node::from_json(json!({"type": "string"}));
    let b = Node::from_json(json!({"type": "string"}));
    let first = registry.register(&a, "Pet", Some("./a/Pet.yaml"));
    let second = registry.register(&b, "Pet", Some("./b/Pet.yaml"));
    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn distinct_schema_with_same_suggested_name_gets_numeric_suffix() {
    let mut registry = ComponentRegistry::new();
    let a = Node::from_json(json!({"type": "string"}));
    let b = Node::from_json(json!({"type": "integer"}));
    let first = registry.register(&a, "Pet", None);
    let second = registry.register(&b, "Pet", None);
    assert_ne!(first, second);
    assert_eq!(second, "Pet_2");
  }

  #[test]
  fn ambiguous_basename_is_not_resolvable() {
    let mut registry = ComponentRegistry::new();
    let a = Node::from_json(json!({"type": "string"}));
    let b = Node::from_json(json!({"type": "integer"}));
    registry.register(&a, "Pet", Some("./a/Pet.yaml"));
    registry.register(&b, "Pet", Some("./b/Pet.yaml"));
    assert!(registry.name_by_basename("Pet.yaml").is_none());
  }

  #[test]
  fn seed_existing_with_origin_is_resolvable_by_origin_and_basename() {
    let mut registry = ComponentRegistry::new();
    let schema = Node::from_json(json!({"type": "object"}));
    registry.seed_existing("Pet", schema, Some("./schemas/Pet.yaml"));
    assert_eq!(registry.name_by_origin("./schemas/Pet.yaml"), Some("Pet"));
    assert_eq!(registry.name_by_basename("Pet.yaml"), Some("Pet"));
  }
}
