//! Agentwire Core Library
//!
//! Detects which coding agents are present on a machine or in a project and
//! registers a tool-server entry in each agent's own configuration format,
//! without disturbing anything else in those files.

pub mod agent;
pub mod config;
pub mod context;
pub mod detection;
pub mod error;
pub mod fs;
pub mod guidelines;
pub mod platform;
pub mod registry;
pub mod server;
pub mod status;
pub mod writers;

/// Re-exports of commonly used types
pub mod prelude {
    // Agents
    pub use crate::agent::{Agent, InstallStrategy, PlatformDetection};
    pub use crate::registry::AgentRegistry;

    // Detection
    pub use crate::detection::{CommandProbe, DetectionCache, DetectionSpec, WhichProbe};
    pub use crate::platform::Platform;

    // Installation
    pub use crate::context::InstallContext;
    pub use crate::error::{InstallError, InstallOutcome};
    pub use crate::server::{EntryShape, ServerEntry};
    pub use crate::writers::{CommandRunner, StructuredMergeWriter, TableSectionWriter};

    // Configuration
    pub use crate::config::{AgentwireConfig, ServerConfig};

    // Status
    pub use crate::status::{AgentStatus, StatusReport, collect_status};
}
