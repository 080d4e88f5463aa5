use thiserror::Error;

/// Failures of the Rust parser used for symbol lookup and syntax checks.
#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("no Rust parser available on this thread")]
    ParserInit,

    #[error("Rust grammar rejected by the tree-sitter runtime")]
    LanguageSet,

    #[error("tree-sitter returned no tree for the source")]
    ParseFailed,

    #[error("invalid item query: {message}")]
    InvalidQuery { message: String },
}
