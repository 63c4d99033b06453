//! Mayhap: grammar-based random text generation.
//!
//! Grammars are plain text: each unindented line names a symbol and the
//! indented lines under it are its weighted production rules. Rules mix
//! literal text with bracketed references, inline choices, ranges and
//! modifiers, and expand into random text with a seeded RNG.

pub mod core;

pub use crate::core::config::GeneratorConfig;
pub use crate::core::expand::{ExpansionError, Expander};
pub use crate::core::generator::{Generator, GeneratorBuilder, GeneratorError};
pub use crate::core::grammar::{Grammar, GrammarError, SyntaxError};
pub use crate::core::inflect::{Inflector, InflectorKind};
