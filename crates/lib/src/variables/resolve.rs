//! Recursive substitution of `%{name}` references.

use std::collections::HashMap;

use super::VariableError;
use super::scope::{ScopeValue, VariableScope};
use crate::document::Node;
use crate::placeholder::{self, Segment};

/// Resolve every reference in `node` against `scope`, returning a new tree.
pub fn resolve(node: &Node, scope: &VariableScope) -> Result<Node, VariableError> {
  Substitution::new(scope).resolve_node(node)
}

/// A substitution pass over one scope.
///
/// Each variable is resolved at most once; the text is memoized for the rest
/// of the pass. Resolution carries the chain of names currently being
/// resolved so that a variable depending on itself is reported instead of
/// recursing forever.
pub struct Substitution<'a> {
  scope: &'a VariableScope,
  resolved: HashMap<String, String>,
}

impl<'a> Substitution<'a> {
  pub fn new(scope: &'a VariableScope) -> Self {
    Self {
      scope,
      resolved: HashMap::new(),
    }
  }

  /// Resolve every string scalar in `node`.
  pub fn resolve_node(&mut self, node: &Node) -> Result<Node, VariableError> {
    self.node_in(node, &mut Vec::new())
  }

  fn node_in(&mut self, node: &Node, chain: &mut Vec<String>) -> Result<Node, VariableError> {
    Ok(match node {
      Node::String(s) => Node::String(self.str_in(s, chain)?),
      Node::Sequence(items) => Node::Sequence(
        items
          .iter()
          .map(|item| self.node_in(item, chain))
          .collect::<Result<_, _>>()?,
      ),
      Node::Mapping(map) => Node::Mapping(
        map
          .iter()
          .map(|(key, value)| Ok((key.clone(), self.node_in(value, chain)?)))
          .collect::<Result<_, VariableError>>()?,
      ),
      scalar => scalar.clone(),
    })
  }

  fn str_in(&mut self, input: &str, chain: &mut Vec<String>) -> Result<String, VariableError> {
    let mut result = String::with_capacity(input.len());
    for segment in placeholder::parse(input)? {
      match segment {
        Segment::Literal(text) => result.push_str(&text),
        Segment::Reference(name) => result.push_str(&self.name_in(&name, chain)?),
      }
    }
    Ok(result)
  }

  fn name_in(&mut self, name: &str, chain: &mut Vec<String>) -> Result<String, VariableError> {
    if let Some(text) = self.resolved.get(name) {
      return Ok(text.clone());
    }

    if let Some(start) = chain.iter().position(|n| n == name) {
      let mut cycle = chain[start..].to_vec();
      cycle.push(name.to_string());
      return Err(VariableError::Cycle { chain: cycle });
    }

    let scope = self.scope;
    let (_, value) = scope.lookup(name).ok_or_else(|| VariableError::Missing {
      name: name.to_string(),
    })?;

    chain.push(name.to_string());
    let text = match value {
      ScopeValue::Literal(text) => Ok(text.clone()),
      ScopeValue::Node(node) => self.node_in(node, chain).map(|node| node.canonical_string()),
    };
    chain.pop();

    let text = text?;
    self.resolved.insert(name.to_string(), text.clone());
    Ok(text)
  }
}
