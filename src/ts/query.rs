use crate::ts::errors::TreeSitterError;
use crate::ts::parser::{node_lines, ParsedSource};
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Query, QueryCursor, StreamingIterator};

/// Capture name every item query marks its whole item with.
pub const ITEM_CAPTURE: &str = "item";

/// An item node captured as `@item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMatch {
    pub byte_start: usize,
    pub byte_end: usize,
    /// 1-based, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub kind: String,
}

/// Compiled tree-sitter query over the Rust grammar.
pub struct QueryEngine {
    query: Query,
    item_index: Option<u32>,
}

impl QueryEngine {
    /// Compile an S-expression query. Patterns should capture the node of
    /// interest as `@item`:
    ///
    /// ```text
    /// (function_item
    ///   name: (identifier) @name
    ///   (#eq? @name "main")) @item
    /// ```
    pub fn new(query_str: &str) -> Result<Self, TreeSitterError> {
        let language = SupportLang::Rust.get_ts_language();
        let query = Query::new(&language, query_str).map_err(|e| TreeSitterError::InvalidQuery {
            message: e.to_string(),
        })?;
        let item_index = query.capture_index_for_name(ITEM_CAPTURE);

        Ok(Self { query, item_index })
    }

    /// Every distinct `@item` node, in document order.
    pub fn find_items(&self, parsed: &ParsedSource<'_>) -> Vec<ItemMatch> {
        let Some(item_index) = self.item_index else {
            return Vec::new();
        };

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, parsed.root_node(), parsed.source.as_bytes());

        let mut items: Vec<ItemMatch> = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures.iter().filter(|c| c.index == item_index) {
                let node = capture.node;
                let (start_line, end_line) = node_lines(node);
                let item = ItemMatch {
                    byte_start: node.start_byte(),
                    byte_end: node.end_byte(),
                    start_line,
                    end_line,
                    kind: node.kind().to_string(),
                };
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }

        items.sort_by_key(|item| (item.byte_start, item.byte_end));
        items
    }
}

/// Query builders. Names are interpolated verbatim, so callers must pass
/// plain identifiers.
pub mod queries {
    /// Any named item: functions (free, associated, trait), structs, enums,
    /// unions, traits, modules, consts, statics, type aliases, macros, and impl
    /// blocks for the named type.
    pub fn symbol_by_name(name: &str) -> String {
        const NAMED: &[(&str, &str)] = &[
            ("function_item", "identifier"),
            ("function_signature_item", "identifier"),
            ("struct_item", "type_identifier"),
            ("enum_item", "type_identifier"),
            ("union_item", "type_identifier"),
            ("trait_item", "type_identifier"),
            ("type_item", "type_identifier"),
            ("mod_item", "identifier"),
            ("const_item", "identifier"),
            ("static_item", "identifier"),
            ("macro_definition", "identifier"),
        ];

        let mut query: String = NAMED
            .iter()
            .map(|(kind, ident)| {
                format!("({kind} name: ({ident}) @name (#eq? @name \"{name}\")) @item\n")
            })
            .collect();
        query.push_str(&impl_by_type(name));
        query
    }

    /// Impl blocks (inherent or trait) for a type, generic or not.
    pub fn impl_by_type(type_name: &str) -> String {
        format!(
            r#"(impl_item
                type: (type_identifier) @impl_type
                (#eq? @impl_type "{type_name}")) @item
            (impl_item
                type: (generic_type type: (type_identifier) @impl_type)
                (#eq? @impl_type "{type_name}")) @item
            "#
        )
    }

    /// A method inside an impl block for `type_name`.
    pub fn method_by_name(type_name: &str, method_name: &str) -> String {
        format!(
            r#"(impl_item
                type: [(type_identifier) @impl_type
                       (generic_type type: (type_identifier) @impl_type)]
                (#eq? @impl_type "{type_name}")
                body: (declaration_list
                    (function_item
                        name: (identifier) @name
                        (#eq? @name "{method_name}")) @item))"#
        )
    }
}
