//! Agentwire - register a tool server with every coding agent in a project
//!
//! Usage:
//!   agentwire detect                     # Which agents are installed / in use
//!   agentwire install -- php artisan mcp # Register a server with detected agents
//!   agentwire list                       # Show per-agent configuration status
//!   agentwire remove agentwire           # Unregister a server

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentwire_core::config::{AgentwireConfig, DEFAULT_SERVER_KEY, load_project_config};
use agentwire_core::prelude::*;
use agentwire_core::server::is_env_name;
use agentwire_core::status::StatusReport;

#[derive(Parser)]
#[command(name = "agentwire")]
#[command(about = "Coding agent detection & MCP configuration installer", long_about = None)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which agents are installed on this machine and used by the project
    Detect {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Register the server with the selected agents
    Install(InstallArgs),

    /// Show configuration status for every known agent
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove a server entry from agent configuration files
    #[command(alias = "rm")]
    Remove {
        /// Server key to remove
        key: String,

        /// Only touch these agents
        #[arg(long = "agent", value_name = "AGENT")]
        agents: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show problems (non-zero exit if any)
    Quiet,
}

#[derive(Args)]
struct InstallArgs {
    /// Target agents; defaults to agentwire.toml, then detection
    #[arg(long = "agent", value_name = "AGENT")]
    agents: Vec<String>,

    /// Server key (defaults to agentwire.toml or "agentwire")
    #[arg(long)]
    key: Option<String>,

    /// Environment variable for the server (KEY=VALUE)
    #[arg(long, value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Markdown file upserted into each agent's guidelines file
    #[arg(long, value_name = "FILE")]
    guidelines: Option<PathBuf>,

    /// Server command and arguments (after --)
    #[arg(last = true)]
    command: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentwire=info,agentwire_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("Could not determine current directory")?,
    };

    let exit_code = run_cli(cli.command, &project_root)?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn run_cli(command: Commands, project_root: &Path) -> Result<i32> {
    let config = load_project_config(project_root)?.unwrap_or_default();
    let ctx = InstallContext::for_project(project_root)?.with_shell_timeout(config.shell_timeout());
    let registry = AgentRegistry::with_default_agents();

    match command {
        Commands::Detect { format } => run_detect(&registry, &ctx, format),
        Commands::Install(args) => run_install(&registry, &ctx, &config, args),
        Commands::List { format } => run_list(&registry, &ctx, format),
        Commands::Remove {
            key,
            agents,
            format,
        } => run_remove(&registry, &ctx, &key, &agents, format),
    }
}

// =============================================================================
// detect
// =============================================================================

#[derive(Debug, Serialize)]
struct DetectionRow {
    name: String,
    display_name: String,
    on_system: bool,
    in_project: bool,
}

fn run_detect(registry: &AgentRegistry, ctx: &InstallContext, format: OutputFormat) -> Result<i32> {
    let mut cache = DetectionCache::new();
    let rows = detection_rows(registry, ctx, &WhichProbe, &mut cache);

    match format {
        OutputFormat::Table => {
            println!("Project: {}", ctx.project_root().display());
            println!("Platform: {}", ctx.platform());
            println!();
            println!("  {:<16} {:<18} {:<8} Project", "Agent", "Name", "System");
            println!("  {}", "-".repeat(52));
            for row in &rows {
                println!(
                    "  {:<16} {:<18} {:<8} {}",
                    row.name,
                    truncate(&row.display_name, 18),
                    yes_no(row.on_system),
                    yes_no(row.in_project)
                );
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": 1,
            "project_root": ctx.project_root(),
            "platform": ctx.platform(),
            "agents": rows,
        }))?,
        OutputFormat::Quiet => {
            if !rows.iter().any(|r| r.on_system || r.in_project) {
                println!("No agents detected");
                return Ok(1);
            }
        }
    }
    Ok(0)
}

fn detection_rows(
    registry: &AgentRegistry,
    ctx: &InstallContext,
    probe: &dyn CommandProbe,
    cache: &mut DetectionCache,
) -> Vec<DetectionRow> {
    let on_system: Vec<&str> = registry
        .detect_on_system(ctx.platform(), probe, cache)
        .into_iter()
        .map(|a| a.name())
        .collect();

    registry
        .all()
        .iter()
        .map(|agent| DetectionRow {
            name: agent.name().to_string(),
            display_name: agent.display_name().to_string(),
            on_system: on_system.contains(&agent.name()),
            in_project: agent.detect_in_project(ctx.project_root()),
        })
        .collect()
}

// =============================================================================
// install
// =============================================================================

#[derive(Debug, Serialize)]
struct InstallRow {
    agent: String,
    success: bool,
    message: Option<String>,
}

fn run_install(
    registry: &AgentRegistry,
    ctx: &InstallContext,
    config: &AgentwireConfig,
    args: InstallArgs,
) -> Result<i32> {
    let entry = build_entry(config, &args)?;
    let mut cache = DetectionCache::new();
    let targets = select_agents(registry, ctx, config, &args.agents, &WhichProbe, &mut cache)?;
    if targets.is_empty() {
        anyhow::bail!(
            "No agents selected or detected. Use --agent (known agents: {})",
            registry.names().join(", ")
        );
    }

    let guidelines = resolve_guidelines(ctx, config, args.guidelines.as_deref())?;

    let mut rows = Vec::with_capacity(targets.len());
    for agent in targets {
        let mut outcome = agent.install_mcp(ctx, &entry);
        if outcome.success
            && let Some(content) = &guidelines
            && let Err(err) = agent.write_guidelines(ctx, content)
        {
            outcome = InstallOutcome::failed(err.to_string());
        }
        rows.push(InstallRow {
            agent: agent.name().to_string(),
            success: outcome.success,
            message: outcome.message,
        });
    }

    let failed = rows.iter().filter(|r| !r.success).count();
    match args.format {
        OutputFormat::Table => {
            for row in &rows {
                if row.success {
                    match &row.message {
                        Some(note) => {
                            println!("✓ Installed '{}' for {} ({note})", entry.key, row.agent)
                        }
                        None => println!("✓ Installed '{}' for {}", entry.key, row.agent),
                    }
                } else {
                    println!("✗ {}: {}", row.agent, row.message.as_deref().unwrap_or("failed"));
                }
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": 1,
            "key": entry.key,
            "results": rows,
        }))?,
        OutputFormat::Quiet => {
            for row in rows.iter().filter(|r| !r.success) {
                println!("{}: {}", row.agent, row.message.as_deref().unwrap_or("failed"));
            }
        }
    }

    Ok(if failed > 0 { 1 } else { 0 })
}

/// Build the server entry from CLI arguments, falling back to agentwire.toml.
fn build_entry(config: &AgentwireConfig, args: &InstallArgs) -> Result<ServerEntry> {
    let mut entry = match (args.command.split_first(), &config.server) {
        (Some((command, rest)), _) => ServerEntry::new(DEFAULT_SERVER_KEY, command.as_str())
            .with_args(rest.iter().cloned()),
        (None, Some(server)) => server.to_entry(),
        (None, None) => anyhow::bail!(
            "No server command given. Pass it after '--' or add a [server] section to agentwire.toml"
        ),
    };

    if let Some(key) = &args.key {
        entry.key = key.clone();
    } else if let Some(server) = &config.server {
        entry.key = server.key.clone();
    }

    for pair in &args.env {
        let (name, value) = parse_env_pair(pair)?;
        entry.env.insert(name, value);
    }
    Ok(entry)
}

fn parse_env_pair(pair: &str) -> Result<(String, String)> {
    let (name, value) = pair
        .split_once('=')
        .with_context(|| format!("Invalid env '{}': expected KEY=VALUE", pair))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Invalid env '{}': empty variable name", pair);
    }
    if !is_env_name(name) {
        anyhow::bail!("Invalid env '{}': '{}' is not a valid variable name", pair, name);
    }
    Ok((name.to_string(), value.to_string()))
}

/// Explicit `--agent` flags win, then `agents` from agentwire.toml, then the
/// agents the project already uses, then the agents installed on the host.
fn select_agents<'a>(
    registry: &'a AgentRegistry,
    ctx: &InstallContext,
    config: &AgentwireConfig,
    explicit: &[String],
    probe: &dyn CommandProbe,
    cache: &mut DetectionCache,
) -> Result<Vec<&'a Agent>> {
    let requested = if explicit.is_empty() {
        config.agents.as_deref()
    } else {
        Some(explicit)
    };

    if let Some(names) = requested {
        if let Some(unknown) = names.iter().find(|n| registry.get(n).is_none()) {
            anyhow::bail!(
                "Unknown agent '{}' (known agents: {})",
                unknown,
                registry.names().join(", ")
            );
        }
        return Ok(registry.filter_by_names(names));
    }

    let in_project = registry.detect_in_project(ctx.project_root());
    if !in_project.is_empty() {
        tracing::debug!(count = in_project.len(), "using agents detected in project");
        return Ok(in_project);
    }
    Ok(registry.detect_on_system(ctx.platform(), probe, cache))
}

fn resolve_guidelines(
    ctx: &InstallContext,
    config: &AgentwireConfig,
    flag: Option<&Path>,
) -> Result<Option<String>> {
    let path = match (flag, &config.guidelines) {
        (Some(path), _) => ctx.project_root().join(path),
        (None, Some(path)) => ctx.resolve(path),
        (None, None) => return Ok(None),
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read guidelines file: {}", path.display()))?;
    Ok(Some(content))
}

// =============================================================================
// list
// =============================================================================

fn run_list(registry: &AgentRegistry, ctx: &InstallContext, format: OutputFormat) -> Result<i32> {
    let mut cache = DetectionCache::new();
    let report = collect_status(registry, ctx, &WhichProbe, &mut cache);

    match format {
        OutputFormat::Table => print_status_table(&report),
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": 1,
            "project_root": report.project_root,
            "platform": report.platform,
            "agents": report.agents,
            "summary": report.summary,
        }))?,
        OutputFormat::Quiet => {
            for agent in report.agents.iter().filter(|a| a.error.is_some()) {
                println!("{}: {}", agent.name, agent.error.as_deref().unwrap_or_default());
            }
            if report.summary.issues > 0 {
                return Ok(1);
            }
        }
    }
    Ok(0)
}

fn print_status_table(report: &StatusReport) {
    println!("Project: {}", report.project_root.display());
    println!("Platform: {}", report.platform);
    println!();
    println!(
        "  {:<12} {:<10} {:<7} {:<8} {:<30} Servers",
        "Agent", "Strategy", "System", "Project", "Config"
    );
    println!("  {}", "-".repeat(80));

    for agent in &report.agents {
        let config = agent
            .config_path
            .as_ref()
            .map(|p| display_relative(p, &report.project_root))
            .unwrap_or_else(|| "(agent CLI)".to_string());
        let servers = match &agent.error {
            Some(_) => "[Error]".to_string(),
            None if agent.servers.is_empty() => "-".to_string(),
            None => agent.servers.join(", "),
        };

        println!(
            "  {:<12} {:<10} {:<7} {:<8} {:<30} {}",
            truncate(&agent.name, 12),
            agent.strategy,
            yes_no(agent.on_system),
            yes_no(agent.in_project),
            truncate(&config, 30),
            servers
        );
    }

    println!();
    if report.summary.issues > 0 {
        println!(
            "Summary: {} agents, {} installed, {} in project, {} issues",
            report.summary.total,
            report.summary.on_system,
            report.summary.in_project,
            report.summary.issues
        );
        for agent in report.agents.iter().filter(|a| a.error.is_some()) {
            println!("  ⚠ {}: {}", agent.name, agent.error.as_deref().unwrap_or_default());
        }
    } else {
        println!(
            "Summary: {} agents, {} installed, {} in project",
            report.summary.total, report.summary.on_system, report.summary.in_project
        );
    }
}

// =============================================================================
// remove
// =============================================================================

fn run_remove(
    registry: &AgentRegistry,
    ctx: &InstallContext,
    key: &str,
    agents: &[String],
    format: OutputFormat,
) -> Result<i32> {
    let targets: Vec<&Agent> = if agents.is_empty() {
        registry
            .all()
            .iter()
            .filter(|a| a.strategy().path().is_some())
            .collect()
    } else {
        if let Some(unknown) = agents.iter().find(|n| registry.get(n).is_none()) {
            anyhow::bail!("Unknown agent '{}'", unknown);
        }
        registry.filter_by_names(agents)
    };

    let mut results: BTreeMap<String, std::result::Result<bool, String>> = BTreeMap::new();
    for agent in targets {
        let result = agent.remove_mcp(ctx, key).map_err(|e| e.to_string());
        results.insert(agent.name().to_string(), result);
    }

    let failed = results.values().filter(|r| r.is_err()).count();
    match format {
        OutputFormat::Table => {
            let removed: Vec<&str> = results
                .iter()
                .filter(|(_, r)| matches!(r, Ok(true)))
                .map(|(name, _)| name.as_str())
                .collect();
            if removed.is_empty() {
                println!("• '{}' is not configured for any selected agent", key);
            } else {
                println!("✓ Removed '{}' from {}", key, removed.join(", "));
            }
            for (name, result) in &results {
                if let Err(message) = result {
                    println!("  ⚠ {}: {}", name, message);
                }
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = results
                .iter()
                .map(|(name, result)| match result {
                    Ok(removed) => serde_json::json!({"agent": name, "removed": removed}),
                    Err(message) => {
                        serde_json::json!({"agent": name, "removed": false, "error": message})
                    }
                })
                .collect();
            print_json(&serde_json::json!({
                "schema_version": 1,
                "key": key,
                "results": rows,
            }))?;
        }
        OutputFormat::Quiet => {
            for (name, result) in &results {
                if let Err(message) = result {
                    println!("{}: {}", name, message);
                }
            }
        }
    }

    Ok(if failed > 0 { 1 } else { 0 })
}

// =============================================================================
// Helpers
// =============================================================================

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
