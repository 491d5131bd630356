//! Variable resolution for service documents.
//!
//! String scalars anywhere in a merged document may contain `%{name}`
//! references (see [`placeholder`](crate::placeholder) for the syntax). Names
//! are looked up in a [`VariableScope`] built from:
//!
//! 1. artifact resolution outputs (`SERVICE_VERSION`, `SERVICE_BUILD`)
//! 2. the document's `variables` mapping
//! 3. every node of the document by dotted path (`maven.version`)
//! 4. the process environment
//!
//! The first layer defining a name wins. Values coming from the document are
//! themselves resolved before use, so chains of references of any depth work
//! as long as they do not loop.

mod resolve;
mod scope;

use thiserror::Error;

use crate::placeholder::PlaceholderError;

pub use resolve::{Substitution, resolve};
pub use scope::{Layer, ScopeValue, VariableScope};

/// Errors that can occur while substituting variables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
  /// A reference names a variable no layer defines.
  #[error("Variable %{{{name}}} not found")]
  Missing { name: String },

  /// A variable depends on itself, directly or transitively.
  #[error("{}", describe_cycle(.chain))]
  Cycle { chain: Vec<String> },

  /// A reference is syntactically broken.
  #[error(transparent)]
  Placeholder(#[from] PlaceholderError),
}

fn describe_cycle(chain: &[String]) -> String {
  let start = chain.first().map(String::as_str).unwrap_or_default();
  format!("Variable %{{{start}}} has a circular reference: {}", chain.join(" -> "))
}
