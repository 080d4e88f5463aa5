//! Tree-sitter integration for Rust sources.
//!
//! Used for two things: locating named items (so visibility can follow code
//! that moved since it was shown) and the built-in syntax check.

pub mod errors;
pub mod parser;
pub mod query;
pub mod symbols;
pub mod validator;

pub use errors::TreeSitterError;
pub use parser::{ErrorNode, ParsedSource, RustParser};
pub use query::{ItemMatch, QueryEngine};
pub use symbols::TreeSitterSymbols;
pub use validator::syntax_errors;
