//! Top-level pipeline orchestration: runs the seven passes of spec.md §2 in
//! order over one document.
//!
//! Grounded in the teacher's `generator::orchestrator::Orchestrator`, whose
//! `generate`/`generate_with_header` methods run a fixed sequence of stages
//! over one `Spec` and return a stats object; this engine does the same over
//! one `Node`, with two of its stages (discriminator resolver, alias
//! consolidator) looping to an internal fixpoint rather than running once.

use anyhow::Result;

use crate::{
  alias_consolidator, channel_rewriter, collector, discriminator, emitter,
  metrics::{ChannelRewriteStats, NormalizationStats},
  document::Node,
  reference_rewriter,
};

/// Runs the full normalization pipeline (Collector through Emitter) in
/// place over `document`. Does not run the Channel-Ref Rewriter — that pass
/// is independent and exposed separately as [`rewrite_channels`], matching
/// its "independent pass" framing in spec.md §2/§4.7.
pub async fn normalize(document: &mut Node) -> Result<NormalizationStats> {
  let mut stats = NormalizationStats::default();

  let (mut registry, collector_warnings) = collector::collect_with_warnings(document);
  stats.schemas_hoisted = registry.len();
  for warning in collector_warnings {
    stats.record_warning(warning);
  }

  for warning in reference_rewriter::rewrite_with_warnings(document, &registry) {
    stats.record_warning(warning);
  }

  let (mappings_rewritten, discriminators_normalized) = discriminator::resolve_and_normalize(document, &mut registry).await?;
  stats.discriminator_mappings_rewritten = mappings_rewritten;
  stats.discriminators_normalized = discriminators_normalized;
  stats.files_loaded_on_demand = registry.len().saturating_sub(stats.schemas_hoisted);

  let before_consolidation = registry.len();
  alias_consolidator::consolidate(document, &mut registry);
  stats.schemas_deduplicated = before_consolidation.saturating_sub(registry.len());

  emitter::emit(document, &registry);

  Ok(stats)
}

/// Runs only the Channel-Ref Rewriter (spec.md §4.7), independent of
/// [`normalize`]. Idempotent: applying it twice equals applying it once.
pub fn rewrite_channels(document: &mut Node) -> ChannelRewriteStats {
  channel_rewriter::rewrite_channels(document)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn full_pipeline_hoists_dedupes_and_rewrites() {
    let mut doc = Node::from_json(json!({
      "channels": {
        "petsA": {
          "messages": {
            "petCreated": {
              "payload": {"type": "object", "x-origin": "./Pet.yaml", "properties": {"name": {"type": "string"}}}
            }
          }
        },
        "petsB": {
          "messages": {
            "petCreated": {
              "payload": {"type": "object", "x-origin": "./other/Pet.yaml", "properties": {"name": {"type": "string"}}}
            }
          }
        }
      }
    }));

    let stats = normalize(&mut doc).await.unwrap();
    assert_eq!(stats.schemas_deduplicated, 0);

    let schemas = doc.get("components").unwrap().get("schemas").unwrap();
    let map = schemas.as_mapping().unwrap();
    assert_eq!(map.borrow().len(), 1);

    let payload_a = doc.get("channels").unwrap().get("petsA").unwrap().get("messages").unwrap().get("petCreated").unwrap().get("payload").unwrap();
    let payload_b = doc.get("channels").unwrap().get("petsB").unwrap().get("messages").unwrap().get("petCreated").unwrap().get("payload").unwrap();
    assert_eq!(payload_a.get_str("$ref"), payload_b.get_str("$ref"));
  }

  #[tokio::test]
  async fn unresolvable_reference_surfaces_as_a_warning() {
    let mut doc = Node::from_json(json!({
      "channels": {"pets": {"messages": {"petCreated": {"payload": {"$ref": "./Missing.yaml"}}}}}
    }));

    let stats = normalize(&mut doc).await.unwrap();
    assert_eq!(stats.warnings().len(), 1);
  }

  #[test]
  fn rewrite_channels_is_independent_of_normalize() {
    let mut doc = Node::from_json(json!({
      "channels": {"pets": {"x-origin": "./channels/pets.yaml"}},
      "operations": {"receivePet": {"channel": {"$ref": "./channels/pets.yaml"}}}
    }));
    let stats = rewrite_channels(&mut doc);
    assert_eq!(stats.channels_registered, 1);
    assert_eq!(stats.operations_rewritten, 1);
  }
}
