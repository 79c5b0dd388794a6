//! Project configuration (`agentwire.toml`).
//!
//! The file is optional. It pins the agent selection, the server entry to
//! register and the shell timeout.

pub mod parser;
pub mod schema;

pub use parser::{CONFIG_FILE_NAME, load_project_config, parse_config, parse_config_str};
pub use schema::{AgentwireConfig, DEFAULT_SERVER_KEY, ServerConfig};
