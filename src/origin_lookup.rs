//! Shared origin-path resolution helper used by the schema reference
//! rewriter and the channel-ref rewriter (spec.md §4.3, §4.7): both resolve
//! an external `$ref`/`x-origin` string to a registered name by trying an
//! exact path, then a normalized path, then an unambiguous basename.

/// Normalizes a POSIX-style relative path: collapses `.` segments, resolves
/// `..` against preceding segments, and drops a leading `./`.
pub fn normalize_path(path: &str) -> String {
  let mut stack: Vec<&str> = Vec::new();
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        if stack.last().is_some_and(|s| *s != "..") {
          stack.pop();
        } else {
          stack.push("..");
        }
      }
      other => stack.push(other),
    }
  }
  stack.join("/")
}

pub fn basename(path: &str) -> String {
  crate::naming::basename(path)
}

/// A lookup strategy: exact path, then normalized path, then unambiguous
/// basename. `lookup_exact`/`lookup_basename` are supplied by the caller's
/// registry accessors, since schemas and channels keep separate maps.
pub fn resolve_name<'a>(target: &str, lookup_exact: impl Fn(&str) -> Option<&'a str>, lookup_basename: impl Fn(&str) -> Option<&'a str>) -> Option<&'a str> {
  if let Some(name) = lookup_exact(target) {
    return Some(name);
  }
  let normalized = normalize_path(target);
  if normalized != target
    && let Some(name) = lookup_exact(&normalized)
  {
    return Some(name);
  }
  lookup_basename(&basename(target))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_dot_and_dotdot_segments() {
    assert_eq!(normalize_path("./schemas/Pet.yaml"), "schemas/Pet.yaml");
    assert_eq!(normalize_path("a/b/../c.yaml"), "a/c.yaml");
    assert_eq!(normalize_path("../outside/Pet.yaml"), "../outside/Pet.yaml");
  }

  #[test]
  fn resolve_name_falls_back_through_strategies() {
    let exact = |s: &str| if s == "schemas/Pet.yaml" { Some("Pet") } else { None };
    let base = |s: &str| if s == "Pet.yaml" { Some("PetByBasename") } else { None };
    assert_eq!(resolve_name("./schemas/Pet.yaml", exact, base), Some("Pet"));
    assert_eq!(resolve_name("./other/Pet.yaml", exact, base), Some("PetByBasename"));
  }
}
