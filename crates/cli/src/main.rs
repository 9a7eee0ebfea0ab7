mod runtime_commands;
mod skills_commands;
mod state_commands;
mod workspace_commands;

use std::path::PathBuf;

use {
    aios_config::AiosConfig,
    clap::{Parser, Subcommand},
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "aios", about = "aios: skill distribution and workspace coherence", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides AIOS_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Workspace directory (overrides AIOS_WORKSPACE_DIR and config).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Project directory skills are installed into (overrides AIOS_PROJECT_DIR).
    #[arg(long, global = true)]
    project: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Author, lint, test and distribute skills.
    Skills {
        #[command(subcommand)]
        action: skills_commands::SkillAction,
    },
    /// Track projects and keep workspace links coherent.
    Workspace {
        #[command(subcommand)]
        action: workspace_commands::WorkspaceAction,
    },
    /// Execution planning, health and connector onboarding.
    Runtime {
        #[command(subcommand)]
        action: runtime_commands::RuntimeAction,
    },
    /// Tray state, analytics snapshots, audit bundles and backups.
    State {
        #[command(subcommand)]
        action: state_commands::StateAction,
    },
}

/// Logs go to stderr so stdout stays machine readable.
fn init_telemetry(json_logs: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Token cancelled on Ctrl-C so in-flight operations stop between phases.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AiosConfig> {
    let mut config = aios_config::load()?;
    if let Some(ref dir) = cli.workspace {
        config.workspace_dir = dir.clone();
    }
    if let Some(ref dir) = cli.project {
        config.project_dir = dir.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = resolve_config(&cli);
    let level = match &config {
        Ok(config) => config.log_level.as_str(),
        Err(_) => cli.log_level.as_deref().unwrap_or("info"),
    };
    init_telemetry(cli.json_logs, level);
    let config = config?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        workspace = %config.workspace_dir.display(),
        project = %config.project_dir.display(),
        "aios starting"
    );
    let cancel = cancel_on_ctrl_c();

    match cli.command {
        Commands::Skills { action } => {
            skills_commands::handle_skills(action, &config, &cancel).await
        },
        Commands::Workspace { action } => {
            workspace_commands::handle_workspace(action, &config, &cancel).await
        },
        Commands::Runtime { action } => {
            runtime_commands::handle_runtime(action, &config, &cancel).await
        },
        Commands::State { action } => state_commands::handle_state(action, &config, &cancel).await,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aios",
            "workspace",
            "list",
            "--workspace",
            "/tmp/ws",
            "--json-logs",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
        assert!(cli.json_logs);
    }

    #[test]
    fn unknown_command_is_a_usage_error() {
        let Err(err) = Cli::try_parse_from(["aios", "bogus"]) else {
            panic!("expected a parse error");
        };
        assert_eq!(err.exit_code(), 2);
    }
}
