//! Writers that register a server entry in an agent's configuration.

pub mod jsonc;
pub mod shell;
pub mod structured;
pub mod table;

pub use shell::{CommandOutput, CommandRunner, ShellCommandInstaller, SystemRunner};
pub use structured::StructuredMergeWriter;
pub use table::TableSectionWriter;
