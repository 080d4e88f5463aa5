pub mod loader;
pub mod schema;

pub use loader::{
    find_config, load_for_workspace, load_from_path, load_from_str, ConfigError, CONFIG_FILE_NAME,
};
pub use schema::{AutofixConfig, CheckConfig, PatcherConfig, ValidationError, ValidationIssue};
