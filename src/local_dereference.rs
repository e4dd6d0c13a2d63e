//! Bounded, single-file dereferencing for on-demand loads inside the
//! Discriminator-Mapping Resolver (spec.md §4.4 step 3), plus the
//! directory-scan fallback of §4.4 step 2 and the working-directory scoped
//! acquisition spec.md §5/§9 require.
//!
//! Grounded in the teacher's `utils::spec::SpecLoader` for the
//! extension-sniffed load, generalized here to also walk the loaded file's
//! own schema tree and tag every subtree's `x-origin`, since (unlike the
//! teacher, which loads one fully-formed spec) this resolver must dereference
//! a single file in isolation and hand the result back into the registry.

use std::{
  collections::HashSet,
  env, fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tokio::fs as async_fs;

use crate::{
  document::Node,
  format,
  schema_walker::{self, PathSegment, SchemaVisitor, Slot},
};

const SKIP_DIRS: [&str; 3] = [".git", "node_modules", "lib"];

/// Restores the previous working directory unconditionally, including on
/// panic unwind, matching the scoped-acquisition discipline spec.md §5/§9
/// mandate for the directory the upstream resolver's relative refs are
/// resolved against.
pub struct WorkingDirGuard {
  previous: PathBuf,
}

impl WorkingDirGuard {
  pub fn enter(dir: &Path) -> Result<Self> {
    let previous = env::current_dir().context("reading current working directory")?;
    env::set_current_dir(dir).with_context(|| format!("entering directory {}", dir.display()))?;
    Ok(Self { previous })
  }
}

impl Drop for WorkingDirGuard {
  fn drop(&mut self) {
    let _ = env::set_current_dir(&self.previous);
  }
}

/// Loads `path`, parses it as YAML or JSON, tags the root with `x-origin`,
/// then performs a bounded single-file dereference: any `$ref` at a schema
/// position pointing at another relative file in the same directory tree is
/// itself loaded and inlined, tagged with its own `x-origin`, recursively.
/// A visited-path set bounds recursion — once a file has been inlined once
/// it is never inlined again within the same on-demand load, which is
/// sufficient to terminate on self-referential file layouts.
pub async fn load_and_dereference(path: &Path, resolved_origin: &str) -> Result<Node> {
  let mut visited = HashSet::new();
  load_one(path, resolved_origin, &mut visited).await
}

/// Loads and dereferences `path` relative to the process's current working
/// directory, then scopes into the file's own directory (spec.md §5/§9)
/// before resolving any relative refs it contains, so those refs are in turn
/// resolved relative to the current directory the same way a real cwd-based
/// tool would see them. The guard is restored on every exit path, including
/// an error partway through.
async fn load_one(path: &Path, origin: &str, visited: &mut HashSet<PathBuf>) -> Result<Node> {
  let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
  visited.insert(canonical);

  let content = async_fs::read_to_string(path).await.with_context(|| format!("reading {}", path.display()))?;
  let detected = format::SpecFormat::detect(path, &content);
  let node = format::parse(detected, &content).with_context(|| format!("parsing {}", path.display()))?;
  node.set("x-origin", Node::string(origin.to_string()));

  let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
  match dir {
    Some(dir) => {
      let _guard = WorkingDirGuard::enter(dir)?;
      dereference_refs_in(&node, visited).await?;
    }
    None => dereference_refs_in(&node, visited).await?,
  }

  Ok(node)
}

async fn dereference_refs_in(root: &Node, visited: &mut HashSet<PathBuf>) -> Result<()> {
  struct Candidate {
    slot: Slot,
    target: String,
  }

  let mut candidates = Vec::new();
  {
    struct Collect<'a> {
      out: &'a mut Vec<Candidate>,
    }
    impl SchemaVisitor for Collect<'_> {
      fn visit(&mut self, node: &Node, slot: &Slot, _path: &[PathSegment]) -> bool {
        if let Some(target) = node.as_ref_target()
          && !target.starts_with('#')
        {
          self.out.push(Candidate { slot: slot.clone(), target });
          return true;
        }
        false
      }
    }
    let mut path = Vec::new();
    schema_walker::walk_schema(root.clone(), Slot::Root, &mut path, &mut Collect { out: &mut candidates });
  }

  for candidate in candidates {
    let target_path = PathBuf::from(&candidate.target);
    let canonical = target_path.canonicalize().unwrap_or_else(|_| target_path.clone());
    if visited.contains(&canonical) || !target_path.exists() {
      continue;
    }
    let loaded = Box::pin(load_one(&target_path, &candidate.target, visited)).await?;
    candidate.slot.set(loaded);
  }

  Ok(())
}

/// Recursively scans the working directory's subtree for files named
/// `basename`, skipping `.git`, `node_modules` and the package's own `lib`
/// directory, returning sorted relative paths (spec.md §4.4 step 2).
pub fn scan_for_basename(basename: &str) -> Result<Vec<String>> {
  let root = env::current_dir().context("reading current working directory")?;
  let mut matches = Vec::new();
  scan_dir(&root, &root, basename, &mut matches)?;
  matches.sort();
  Ok(matches)
}

fn scan_dir(root: &Path, dir: &Path, basename: &str, matches: &mut Vec<String>) -> Result<()> {
  let entries = fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
  for entry in entries {
    let entry = entry.context("reading directory entry")?;
    let path = entry.path();
    let file_name = entry.file_name();
    let name = file_name.to_string_lossy();

    if path.is_dir() {
      if SKIP_DIRS.contains(&name.as_ref()) {
        continue;
      }
      scan_dir(root, &path, basename, matches)?;
    } else if name == basename {
      let relative = path.strip_prefix(root).unwrap_or(&path);
      matches.push(relative.to_string_lossy().replace('\\', "/"));
    }
  }
  Ok(())
}
