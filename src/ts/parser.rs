use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser preloaded with the Rust grammar.
pub struct RustParser {
    parser: Parser,
}

impl RustParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        let language = SupportLang::Rust.get_ts_language();
        parser
            .set_language(&language)
            .map_err(|_| TreeSitterError::LanguageSet)?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// Source text together with its syntax tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl ParsedSource<'_> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// ERROR and MISSING nodes, in document order.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        if self.tree.root_node().has_error() {
            collect_error_nodes(self.tree.root_node(), &mut errors);
        }
        errors
    }
}

/// Location of a syntax error; lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub line: usize,
    pub column: usize,
    pub missing: bool,
}

/// 1-based inclusive line span covered by `node`.
pub fn node_lines(node: Node<'_>) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

fn collect_error_nodes(node: Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        let point = node.start_position();
        errors.push(ErrorNode {
            line: point.row + 1,
            column: point.column + 1,
            missing: node.is_missing(),
        });
        // Nested errors inside an ERROR node are noise.
        if node.is_error() {
            return;
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            collect_error_nodes(child, errors);
        }
    }
}
