use crate::pool::with_parser;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ErrorNode;

/// Syntax errors in Rust `source`; empty when it parses cleanly.
pub fn syntax_errors(source: &str) -> Result<Vec<ErrorNode>, TreeSitterError> {
    with_parser(|parser| parser.parse_with_source(source).map(|p| p.error_nodes()))?
}
