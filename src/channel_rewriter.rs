//! Channel-Ref Rewriter (spec.md §4.7), the independent companion pass to
//! the schema reference rewriter: maps externally-originated channels to
//! local JSON pointers, then rewrites `operation.channel.$ref` and
//! `operation.reply.channel.$ref`.
//!
//! Isomorphic to `reference_rewriter.rs`, sharing `origin_lookup.rs`; no
//! teacher file covers channels directly (the teacher has no channel
//! concept), so this module mirrors the schema rewriter's own shape.

use std::collections::{HashMap, HashSet};

use crate::{collector, document::Node, metrics::NormalizationWarning, origin_lookup};

#[derive(Debug, Default)]
pub struct ChannelRegistry {
  origin_to_pointer: HashMap<String, String>,
  basename_to_pointer: HashMap<String, String>,
  ambiguous_basenames: HashSet<String>,
}

impl ChannelRegistry {
  fn record(&mut self, origin: &str, pointer: &str) {
    self.origin_to_pointer.insert(origin.to_string(), pointer.to_string());

    let basename = origin_lookup::basename(origin);
    match self.basename_to_pointer.get(&basename) {
      None => {
        self.basename_to_pointer.insert(basename, pointer.to_string());
      }
      Some(existing) if existing != pointer => {
        self.ambiguous_basenames.insert(basename);
      }
      _ => {}
    }
  }

  fn by_origin(&self, origin: &str) -> Option<&str> {
    self.origin_to_pointer.get(origin).map(String::as_str)
  }

  fn by_basename(&self, basename: &str) -> Option<&str> {
    if self.ambiguous_basenames.contains(basename) {
      return None;
    }
    self.basename_to_pointer.get(basename).map(String::as_str)
  }
}

fn encode_pointer_segment(segment: &str) -> String {
  segment.replace('~', "~0").replace('/', "~1")
}

/// Scans `document.channels` and `document.components.channels`, then
/// rewrites `operation.channel.$ref` / `operation.reply.channel.$ref` in
/// `document.operations` and `document.components.operations`.
pub fn rewrite_channels(doc: &Node) -> crate::metrics::ChannelRewriteStats {
  let mut registry = ChannelRegistry::default();

  let mut channels_registered = 0usize;
  channels_registered += register_channels(doc, &["channels"], "#/channels", &mut registry);
  channels_registered += register_channels(doc, &["components", "channels"], "#/components/channels", &mut registry);

  let mut stats = crate::metrics::ChannelRewriteStats { channels_registered, ..Default::default() };

  let mut operations_rewritten = 0usize;
  operations_rewritten += rewrite_operations(doc, &["operations"], &registry, &mut stats);
  operations_rewritten += rewrite_operations(doc, &["components", "operations"], &registry, &mut stats);
  stats.operations_rewritten = operations_rewritten;

  stats
}

fn register_channels(doc: &Node, path: &[&str], pointer_prefix: &str, registry: &mut ChannelRegistry) -> usize {
  let Some(channels) = resolve_path(doc, path) else { return 0 };
  let Some(map) = channels.as_mapping() else { return 0 };
  let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  let mut count = 0usize;
  for (name, channel) in entries {
    let Some(origin) = channel.get_str("x-origin") else { continue };
    if !collector::is_external_origin(&origin) {
      continue;
    }
    let pointer = format!("{pointer_prefix}/{}", encode_pointer_segment(&name));
    registry.record(&origin, &pointer);
    count += 1;
  }
  count
}

fn resolve_path(doc: &Node, path: &[&str]) -> Option<Node> {
  let mut current = doc.clone();
  for segment in path {
    current = current.get(segment)?;
  }
  Some(current)
}

fn rewrite_operations(doc: &Node, path: &[&str], registry: &ChannelRegistry, stats: &mut crate::metrics::ChannelRewriteStats) -> usize {
  let Some(operations) = resolve_path(doc, path) else { return 0 };
  let Some(map) = operations.as_mapping() else { return 0 };
  let entries: Vec<(String, Node)> = map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  let mut count = 0usize;
  for (_name, operation) in entries {
    if rewrite_channel_ref(&operation, "channel", registry, stats) {
      count += 1;
    }
    if let Some(reply) = operation.get("reply")
      && rewrite_channel_ref(&reply, "channel", registry, stats)
    {
      count += 1;
    }
  }
  count
}

fn rewrite_channel_ref(container: &Node, key: &str, registry: &ChannelRegistry, stats: &mut crate::metrics::ChannelRewriteStats) -> bool {
  let Some(channel_ref) = container.get(key) else { return false };
  let Some(target) = channel_ref.as_ref_target() else { return false };
  if !collector::is_external_origin(&target) {
    return false;
  }
  match origin_lookup::resolve_name(&target, |t| registry.by_origin(t), |b| registry.by_basename(b)) {
    Some(pointer) => {
      channel_ref.set("$ref", Node::string(pointer.to_string()));
      true
    }
    None => {
      stats.record_warning(NormalizationWarning::UnresolvedChannelReference { target: target.clone() });
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn rewrites_external_channel_ref_to_local_pointer() {
    let doc = Node::from_json(json!({
      "channels": {"pets": {"x-origin": "./channels/pets.yaml"}},
      "operations": {
        "receivePet": {"channel": {"$ref": "./channels/pets.yaml"}}
      }
    }));

    rewrite_channels(&doc);

    let operation = doc.get("operations").unwrap().get("receivePet").unwrap();
    let channel = operation.get("channel").unwrap();
    assert_eq!(channel.get_str("$ref").as_deref(), Some("#/channels/pets"));
  }

  #[test]
  fn rewrites_reply_channel_ref() {
    let doc = Node::from_json(json!({
      "channels": {"pets": {"x-origin": "./channels/pets.yaml"}},
      "operations": {
        "receivePet": {
          "channel": {"$ref": "#/channels/other"},
          "reply": {"channel": {"$ref": "./channels/pets.yaml"}}
        }
      }
    }));

    rewrite_channels(&doc);

    let operation = doc.get("operations").unwrap().get("receivePet").unwrap();
    let reply_channel = operation.get("reply").unwrap().get("channel").unwrap();
    assert_eq!(reply_channel.get_str("$ref").as_deref(), Some("#/channels/pets"));
  }

  #[test]
  fn encodes_tilde_and_slash_in_channel_name() {
    let doc = Node::from_json(json!({
      "channels": {"pets/v1~beta": {"x-origin": "./channels/pets.yaml"}},
      "operations": {"receivePet": {"channel": {"$ref": "./channels/pets.yaml"}}}
    }));

    rewrite_channels(&doc);

    let operation = doc.get("operations").unwrap().get("receivePet").unwrap();
    let channel = operation.get("channel").unwrap();
    assert_eq!(channel.get_str("$ref").as_deref(), Some("#/channels/pets~1v1~0beta"));
  }

  #[test]
  fn unresolvable_channel_ref_is_left_verbatim_and_warns() {
    let doc = Node::from_json(json!({
      "operations": {"receivePet": {"channel": {"$ref": "./channels/missing.yaml"}}}
    }));

    let stats = rewrite_channels(&doc);

    let operation = doc.get("operations").unwrap().get("receivePet").unwrap();
    let channel = operation.get("channel").unwrap();
    assert_eq!(channel.get_str("$ref").as_deref(), Some("./channels/missing.yaml"));
    assert_eq!(stats.warnings().len(), 1);
    assert!(matches!(&stats.warnings()[0], NormalizationWarning::UnresolvedChannelReference { target } if target == "./channels/missing.yaml"));
  }
}
