//! Variable reference parsing.
//!
//! String scalars in service documents may reference variables that are only
//! known once profiles are merged and the artifact version is resolved. This
//! module splits such strings into literal text and references; the
//! [`variables`](crate::variables) module does the actual substitution.
//!
//! # Reference Format
//!
//! - `%{name}` - the value of variable `name` (surrounding whitespace ignored)
//!
//! # Percent Signs
//!
//! A `%` that is not followed by `{` passes through unchanged, so URL-encoded
//! text like `amqp://host:5672/%2F` needs no escaping.
//!
//! # Escaping
//!
//! Use `%%{` to produce a literal `%{`. The text after it is not treated as a
//! reference, so `%%{id}` comes out as `%{id}`.
//!
//! # Example
//!
//! ```
//! use skiff_lib::placeholder::{parse, Segment};
//!
//! let segments = parse("registry.example.com/myservice:%{SERVICE_VERSION}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("registry.example.com/myservice:".to_string()),
//!     Segment::Reference("SERVICE_VERSION".to_string()),
//! ]);
//! ```

use thiserror::Error;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no references)
  Literal(String),

  /// A `%{name}` reference to be resolved
  Reference(String),
}

/// Errors that can occur while parsing references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed variable reference at position {0}")]
  Unclosed(usize),

  #[error("empty variable reference at position {0}")]
  Empty(usize),
}

/// Parse a string containing `%{...}` references into segments.
///
/// # Errors
///
/// Returns an error if a reference is never closed or names nothing.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '%' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '%')) => {
        // "%%", escape only when a brace follows
        chars.next();
        match chars.peek() {
          Some((_, '{')) => {
            chars.next();
            literal.push_str("%{");
          }
          _ => literal.push_str("%%"),
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }

        let name = name.trim();
        if name.is_empty() {
          return Err(PlaceholderError::Empty(pos));
        }
        segments.push(Segment::Reference(name.to_string()));
      }
      _ => literal.push('%'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}
