//! Component name derivation (spec.md §3, "Name derivation").
//!
//! Grounded in the teacher's `converter/naming.rs::ensure_unique`: suffix a
//! colliding candidate with an ascending integer until it is free.

use std::path::Path;

/// Strips directory and extension from a source string (an origin path, a
/// `$ref`, or a pre-existing component name), sanitizes the remaining
/// characters, and guarantees a non-empty, non-digit-led result.
pub fn derive_name(source: &str) -> String {
  let without_fragment = source.split('#').next().unwrap_or(source);
  let stem = Path::new(without_fragment)
    .file_stem()
    .and_then(|s| s.to_str())
    .unwrap_or(without_fragment);

  let sanitized: String = stem
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
    .collect();

  let trimmed = sanitized.trim_matches(|c| matches!(c, '_' | '-' | '.'));

  let mut name = if trimmed.is_empty() { "Schema".to_string() } else { trimmed.to_string() };

  if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
    name = format!("Schema_{name}");
  }

  name
}

/// The file basename of a source string (no directory, extension kept),
/// used for ambiguity detection in the component registry.
pub fn basename(source: &str) -> String {
  let without_fragment = source.split('#').next().unwrap_or(source);
  Path::new(without_fragment)
    .file_name()
    .and_then(|s| s.to_str())
    .unwrap_or(without_fragment)
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_directory_and_extension() {
    assert_eq!(derive_name("./schemas/Pet.yaml"), "Pet");
    assert_eq!(derive_name("/abs/path/Owner.json"), "Owner");
  }

  #[test]
  fn sanitizes_invalid_characters() {
    assert_eq!(derive_name("my pet!.yaml"), "my_pet_");
  }

  #[test]
  fn empty_source_falls_back_to_schema() {
    assert_eq!(derive_name("...yaml"), "Schema");
  }

  #[test]
  fn digit_leading_name_gets_prefixed() {
    assert_eq!(derive_name("123Pet.yaml"), "Schema_123Pet");
  }

  #[test]
  fn basename_keeps_extension() {
    assert_eq!(basename("./schemas/Pet.yaml"), "Pet.yaml");
  }
}
