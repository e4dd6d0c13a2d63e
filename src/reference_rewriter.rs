//! The Reference Rewriter (spec.md §4.3): a second document walk that
//! replaces every non-root schema occurrence with a local component
//! reference.
//!
//! Grounded in the teacher's `utils::refs::parse_schema_ref_path` /
//! `extract_schema_ref_name` for ref-string handling, generalized here to
//! also rewrite the document in place rather than just parse a ref string.

use crate::{
  collector,
  document::Node,
  metrics::NormalizationWarning,
  origin_lookup,
  registry::ComponentRegistry,
  schema_walker::{self, PathSegment, SchemaVisitor, Slot},
};

/// Runs the Reference Rewriter. Unresolvable external references are left as
/// the original `$ref` verbatim (spec.md §7) and silently skipped — use
/// [`rewrite_with_warnings`] to observe those soft failures.
pub fn rewrite(doc: &Node, registry: &ComponentRegistry) {
  let mut warnings = Vec::new();
  let mut visitor = RewriteVisitor { registry, warnings: &mut warnings };
  schema_walker::walk_document(doc, &mut visitor);
}

/// Same as [`rewrite`], but also returns the soft-failure warnings recorded
/// along the way.
pub fn rewrite_with_warnings(doc: &Node, registry: &ComponentRegistry) -> Vec<NormalizationWarning> {
  let mut warnings = Vec::new();
  let mut visitor = RewriteVisitor { registry, warnings: &mut warnings };
  schema_walker::walk_document(doc, &mut visitor);
  warnings
}

struct RewriteVisitor<'a> {
  registry: &'a ComponentRegistry,
  warnings: &'a mut Vec<NormalizationWarning>,
}

impl SchemaVisitor for RewriteVisitor<'_> {
  fn visit(&mut self, node: &Node, slot: &Slot, path: &[PathSegment]) -> bool {
    if let Some(target) = node.as_ref_target() {
      if collector::is_local_ref(&target) || !collector::is_external_origin(&target) {
        return true;
      }
      match resolve(self.registry, &target) {
        Some(name) => slot.set(make_local_ref(name, node)),
        None => self.warnings.push(NormalizationWarning::UnresolvedSchemaReference { target: target.clone() }),
      }
      return true;
    }

    if schema_walker::components_schema_root_name(path).is_some() {
      return false;
    }

    if let Some(name) = self.registry.name_for_object(node) {
      let name = name.to_string();
      slot.set(make_local_ref(&name, node));
      return true;
    }

    false
  }
}

fn resolve<'a>(registry: &'a ComponentRegistry, target: &str) -> Option<&'a str> {
  origin_lookup::resolve_name(target, |t| registry.name_by_origin(t), |b| registry.name_by_basename(b))
}

fn make_local_ref(name: &str, source: &Node) -> Node {
  let ref_node = Node::empty_mapping();
  ref_node.set("$ref", Node::string(collector::local_ref(name)));
  if let Some(description) = source.get("description") {
    ref_node.set("description", description);
  }
  if let Some(summary) = source.get("summary") {
    ref_node.set("summary", summary);
  }
  ref_node
}
