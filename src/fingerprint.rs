//! Cycle-safe, order-independent schema fingerprinting.
//!
//! Mirrors the teacher's `converter/hashing.rs`: canonicalize, then digest
//! with `blake3`. The canonicalization differs from `json-canon` because it
//! must (a) skip the bookkeeping/documentation keys spec.md excludes from
//! the equivalence predicate, and (b) terminate on cycles, neither of which
//! a generic JSON canonicalizer knows how to do.

use std::{collections::HashSet, rc::Rc};

use crate::document::{Node, Scalar};

const EXCLUDED_KEYS: [&str; 3] = ["x-origin", "description", "summary"];

/// Two schemas are equivalent iff their fingerprints are equal.
pub fn fingerprint(node: &Node) -> String {
  let mut ancestors = HashSet::new();
  let canonical = serialize(node, &mut ancestors);
  blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

fn serialize(node: &Node, ancestors: &mut HashSet<usize>) -> String {
  match node {
    Node::Scalar(scalar) => serialize_scalar(scalar),
    Node::Sequence(seq) => {
      let parts: Vec<String> = seq.borrow().iter().map(|item| serialize(item, ancestors)).collect();
      format!("[{}]", parts.join(","))
    }
    Node::Mapping(map) => {
      let id = Rc::as_ptr(map) as usize;
      if !ancestors.insert(id) {
        return "{\"$cycle\":true}".to_string();
      }

      let borrowed = map.borrow();
      let mut keys: Vec<&String> = borrowed.keys().filter(|k| !EXCLUDED_KEYS.contains(&k.as_str())).collect();
      keys.sort();

      let parts: Vec<String> = keys
        .into_iter()
        .map(|key| {
          let child = borrowed.get(key).expect("key came from this mapping");
          format!("{}:{}", serialize_scalar(&Scalar::String(key.clone())), serialize(child, ancestors))
        })
        .collect();

      ancestors.remove(&id);
      format!("{{{}}}", parts.join(","))
    }
  }
}

fn serialize_scalar(scalar: &Scalar) -> String {
  match scalar {
    Scalar::Null => "null".to_string(),
    Scalar::Bool(b) => b.to_string(),
    Scalar::Number(n) => n.to_string(),
    Scalar::String(s) => serde_json::to_string(s).expect("strings always serialize"),
  }
}
