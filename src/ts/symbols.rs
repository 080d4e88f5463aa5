use std::path::Path;

use crate::block::FileRange;
use crate::pool::with_parser;
use crate::ts::query::{queries, QueryEngine};
use crate::visibility::{SymbolError, SymbolLookup};

/// Symbol lookup for Rust sources backed by tree-sitter.
///
/// Accepts a bare name (`run`, `Config`) or `Type::method`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterSymbols;

impl TreeSitterSymbols {
    /// Line ranges of `symbol` within `source`.
    pub fn ranges_in_source(
        &self,
        path: &Path,
        source: &str,
        symbol: &str,
    ) -> Result<Vec<FileRange>, SymbolError> {
        let query = match symbol.rsplit_once("::") {
            Some((type_name, method)) => {
                let type_name = type_name.rsplit("::").next().unwrap_or(type_name);
                require_identifier(path, type_name)?;
                require_identifier(path, method)?;
                queries::method_by_name(type_name, method)
            }
            None => {
                require_identifier(path, symbol)?;
                queries::symbol_by_name(symbol)
            }
        };

        let engine = QueryEngine::new(&query)?;
        let items = with_parser(|parser| {
            parser
                .parse_with_source(source)
                .map(|parsed| engine.find_items(&parsed))
        })??;

        if items.is_empty() {
            return Err(SymbolError::NotFound {
                path: path.to_path_buf(),
                symbol: symbol.to_string(),
            });
        }

        Ok(items
            .into_iter()
            .map(|item| FileRange::new(path, item.start_line, item.end_line))
            .collect())
    }
}

impl SymbolLookup for TreeSitterSymbols {
    fn symbol_ranges(&self, absolute_path: &Path, symbol: &str) -> Result<Vec<FileRange>, SymbolError> {
        if absolute_path.extension().and_then(|e| e.to_str()) != Some("rs") {
            return Err(SymbolError::Unsupported {
                path: absolute_path.to_path_buf(),
                reason: "only Rust sources are supported".to_string(),
            });
        }

        let source = std::fs::read_to_string(absolute_path).map_err(|source| SymbolError::Io {
            path: absolute_path.to_path_buf(),
            source,
        })?;
        self.ranges_in_source(absolute_path, &source, symbol)
    }
}

fn require_identifier(path: &Path, name: &str) -> Result<(), SymbolError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SymbolError::Unsupported {
            path: path.to_path_buf(),
            reason: format!("'{name}' is not an identifier"),
        })
    }
}
