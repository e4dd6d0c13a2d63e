//! Alias Consolidator (spec.md §4.5): groups registered schemas by
//! `(normalizedBaseName, fingerprint)`, picks one canonical name per group,
//! and rewrites every reference to an alias onto its canonical name, to a
//! fixpoint.
//!
//! Grounded in the teacher's `converter::naming::compute_best_name`, whose
//! tie-break ladder (no numeric suffix, then shorter, then lexicographic) is
//! reused here verbatim for canonical-name selection across an equivalence
//! class rather than across a set of candidate labels for one type.

use std::{
  collections::{HashMap, HashSet},
  rc::Rc,
};

use crate::{
  collector,
  document::Node,
  fingerprint::fingerprint,
  registry::{ComponentRegistry, normalized_base_name},
};

const EXTENSION_MAPPING_KEY: &str = "x-discriminator-mapping";

pub fn consolidate(doc: &Node, registry: &mut ComponentRegistry) {
  loop {
    let aliases = build_alias_map(registry);
    if aliases.is_empty() {
      break;
    }

    rewrite_all_refs(doc, &aliases);
    for (alias, canonical) in &aliases {
      registry.rebind_alias(alias, canonical);
    }
    registry.rebuild_signatures();
  }
}

fn build_alias_map(registry: &ComponentRegistry) -> HashMap<String, String> {
  let mut groups: HashMap<(String, String), Vec<String>> = HashMap::new();
  for (name, schema) in registry.iter() {
    let key = (normalized_base_name(name), fingerprint(schema));
    groups.entry(key).or_default().push(name.to_string());
  }

  let mut aliases = HashMap::new();
  for names in groups.into_values() {
    if names.len() < 2 {
      continue;
    }
    let canonical = choose_canonical(&names);
    for name in names {
      if name != canonical {
        aliases.insert(name, canonical.clone());
      }
    }
  }
  aliases
}

fn choose_canonical(names: &[String]) -> String {
  let without_suffix: Vec<&String> = names.iter().filter(|n| n.as_str() == normalized_base_name(n)).collect();
  let pool: Vec<&String> = if without_suffix.is_empty() { names.iter().collect() } else { without_suffix };

  pool
    .into_iter()
    .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
    .expect("group has at least one member")
    .clone()
}

/// Rewrites every local component `$ref` naming an alias, and every alias
/// named by a local ref inside `x-discriminator-mapping`, across the whole
/// document — not just schema positions, since discriminator mappings and
/// other extension values are opaque to the schema walker's keyword rules.
fn rewrite_all_refs(doc: &Node, aliases: &HashMap<String, String>) {
  let mut seen = HashSet::new();
  walk_any(doc, &mut seen, aliases);
}

fn walk_any(node: &Node, seen: &mut HashSet<usize>, aliases: &HashMap<String, String>) {
  match node {
    Node::Sequence(seq) => {
      let id = Rc::as_ptr(seq) as usize;
      if !seen.insert(id) {
        return;
      }
      let items: Vec<Node> = seq.borrow().iter().cloned().collect();
      for item in &items {
        walk_any(item, seen, aliases);
      }
    }
    Node::Mapping(map) => {
      let id = Rc::as_ptr(map) as usize;
      if !seen.insert(id) {
        return;
      }
      rewrite_ref_in_place(node, aliases);
      rewrite_extension_mapping(node, aliases);

      let children: Vec<Node> = map.borrow().values().cloned().collect();
      for child in &children {
        walk_any(child, seen, aliases);
      }
    }
    Node::Scalar(_) => {}
  }
}

fn rewrite_ref_in_place(node: &Node, aliases: &HashMap<String, String>) {
  let Some(target) = node.as_ref_target() else { return };
  if !collector::is_local_ref(&target) {
    return;
  }
  let Some(alias_name) = collector::name_from_local_ref(&target) else { return };
  if let Some(canonical) = aliases.get(alias_name) {
    node.set("$ref", Node::string(collector::local_ref(canonical)));
  }
}

fn rewrite_extension_mapping(node: &Node, aliases: &HashMap<String, String>) {
  let Some(mapping) = node.get(EXTENSION_MAPPING_KEY) else { return };
  let Some(map) = mapping.as_mapping() else { return };
  let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  for (key, value) in entries {
    let Some(target) = value.as_str() else { continue };
    if !collector::is_local_ref(target) {
      continue;
    }
    let Some(alias_name) = collector::name_from_local_ref(target) else { continue };
    if let Some(canonical) = aliases.get(alias_name) {
      mapping.set(&key, Node::string(collector::local_ref(canonical)));
    }
  }
}
