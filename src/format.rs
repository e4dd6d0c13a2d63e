//! Format sniffing and parse/serialize helpers shared by the top-level CLI
//! loader and the on-demand local dereferencer.
//!
//! Mirrors the teacher's `utils::spec::SpecFormat`/`SpecLoader`: detect the
//! format from the file extension, falling back to content sniffing when the
//! extension is missing or unrecognized.

use std::path::Path;

use anyhow::{Context, Result};

use crate::document::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
  Json,
  Yaml,
}

impl SpecFormat {
  pub fn from_extension(path: &Path) -> Option<SpecFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
      "json" => Some(SpecFormat::Json),
      "yaml" | "yml" => Some(SpecFormat::Yaml),
      _ => None,
    }
  }

  pub fn sniff(content: &str) -> SpecFormat {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
      SpecFormat::Json
    } else {
      SpecFormat::Yaml
    }
  }

  pub fn detect(path: &Path, content: &str) -> SpecFormat {
    Self::from_extension(path).unwrap_or_else(|| Self::sniff(content))
  }
}

pub fn parse(format: SpecFormat, content: &str) -> Result<Node> {
  match format {
    SpecFormat::Json => {
      let value: serde_json::Value = serde_json::from_str(content).context("parsing JSON document")?;
      Ok(Node::from_json(value))
    }
    SpecFormat::Yaml => {
      let value: serde_yaml::Value = serde_yaml::from_str(content).context("parsing YAML document")?;
      Ok(Node::from_json(yaml_to_json(value)?))
    }
  }
}

pub fn serialize(format: SpecFormat, node: &Node) -> Result<String> {
  let value = node.to_json();
  match format {
    SpecFormat::Json => serde_json::to_string_pretty(&value).context("serializing JSON document"),
    SpecFormat::Yaml => serde_yaml::to_string(&value).context("serializing YAML document"),
  }
}

/// A YAML value may contain non-string mapping keys; AsyncAPI documents
/// never do in practice, but a stray one must fail loudly rather than panic.
fn yaml_to_json(value: serde_yaml::Value) -> Result<serde_json::Value> {
  serde_json::to_value(&value).context("converting YAML value to JSON")
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  #[test]
  fn detects_format_from_extension() {
    assert_eq!(SpecFormat::from_extension(&PathBuf::from("a.yaml")), Some(SpecFormat::Yaml));
    assert_eq!(SpecFormat::from_extension(&PathBuf::from("a.yml")), Some(SpecFormat::Yaml));
    assert_eq!(SpecFormat::from_extension(&PathBuf::from("a.json")), Some(SpecFormat::Json));
    assert_eq!(SpecFormat::from_extension(&PathBuf::from("a")), None);
  }

  #[test]
  fn sniffs_json_vs_yaml_content() {
    assert_eq!(SpecFormat::sniff("{\"a\": 1}"), SpecFormat::Json);
    assert_eq!(SpecFormat::sniff("a: 1\n"), SpecFormat::Yaml);
  }

  #[test]
  fn parses_json_document_into_node() {
    let node = parse(SpecFormat::Json, "{\"a\": 1}").unwrap();
    assert_eq!(node.get("a").unwrap().to_json(), serde_json::json!(1));
  }
}
