//! Normalization stats and warnings, a structural analogue of the teacher's
//! `generator::metrics::{GenerationStats, GenerationWarning}`.

use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum NormalizationWarning {
  #[strum(to_string = "unresolved schema reference: {target}")]
  UnresolvedSchemaReference { target: String },
  #[strum(to_string = "unresolved channel reference: {target}")]
  UnresolvedChannelReference { target: String },
  #[strum(to_string = "skipped malformed schema content at {path}")]
  MalformedSchemaContent { path: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationStats {
  pub schemas_hoisted: usize,
  pub schemas_deduplicated: usize,
  pub discriminators_normalized: usize,
  pub discriminator_mappings_rewritten: usize,
  pub files_loaded_on_demand: usize,
  warnings: Vec<NormalizationWarning>,
}

impl NormalizationStats {
  pub fn record_warning(&mut self, warning: NormalizationWarning) {
    self.warnings.push(warning);
  }

  pub fn warnings(&self) -> &[NormalizationWarning] {
    &self.warnings
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRewriteStats {
  pub channels_registered: usize,
  pub operations_rewritten: usize,
  warnings: Vec<NormalizationWarning>,
}

impl ChannelRewriteStats {
  pub fn record_warning(&mut self, warning: NormalizationWarning) {
    self.warnings.push(warning);
  }

  pub fn warnings(&self) -> &[NormalizationWarning] {
    &self.warnings
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn warning_display_includes_target() {
    let warning = NormalizationWarning::UnresolvedSchemaReference { target: "./Pet.yaml".to_string() };
    assert_eq!(warning.to_string(), "unresolved schema reference: ./Pet.yaml");
  }
}
