//! CLI commands for the execution runtime.

use std::path::PathBuf;

use {
    aios_config::AiosConfig,
    aios_oauth::LoopbackResolver,
    aios_policy::ModelRouter,
    aios_runtime::{
        Connector, ExecutionRequest, OAUTH_TOKEN_ENV, health, onboard_google_drive,
        prepare_execution, token_store_from_config,
    },
    aios_skills::FsSkillInstaller,
    clap::Subcommand,
    secrecy::SecretString,
    serde_json::{Map, Value},
    tokio_util::sync::CancellationToken,
};

use crate::print_json;

#[derive(Subcommand)]
pub enum RuntimeAction {
    /// Report runtime readiness and the active token store.
    Health,
    /// List the available policy packs.
    Packs,
    /// Route a skill run and sanitize its input without executing it.
    Prepare {
        skill_id: String,
        #[arg(long, default_value = "")]
        version: String,
        /// Defaults to the skill id.
        #[arg(long, default_value = "")]
        use_case: String,
        /// `low` selects the lower-cost model under the balanced pack.
        #[arg(long, default_value = "")]
        budget: String,
        #[arg(long, default_value = "")]
        policy_pack: String,
        /// Inline JSON object with the skill input.
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,
        /// File holding the skill input as a JSON object.
        #[arg(long)]
        input_file: Option<PathBuf>,
    },
    /// Connect Google Drive through the OAuth loopback flow, or with a token
    /// from AIOS_OAUTH_TOKEN.
    ConnectDrive,
}

fn parse_input(raw: Option<&str>) -> anyhow::Result<Map<String, Value>> {
    match raw {
        None => Ok(Map::new()),
        Some(raw) => match serde_json::from_str(raw)? {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("input must be a JSON object"),
        },
    }
}

pub async fn handle_runtime(
    action: RuntimeAction,
    config: &AiosConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match action {
        RuntimeAction::Health => print_json(&health(config))?,
        RuntimeAction::Packs => print_json(&ModelRouter::new().packs())?,
        RuntimeAction::Prepare {
            skill_id,
            version,
            use_case,
            budget,
            policy_pack,
            input,
            input_file,
        } => {
            let raw = match input_file {
                Some(path) => Some(tokio::fs::read_to_string(&path).await?),
                None => input,
            };
            let request = ExecutionRequest {
                skill_id,
                version,
                use_case,
                budget,
                policy_pack,
                input: parse_input(raw.as_deref())?,
            };
            print_json(&prepare_execution(&ModelRouter::new(), &request)?)?;
        },
        RuntimeAction::ConnectDrive => {
            let resolver = LoopbackResolver::new(config.oauth.state.clone(), config.oauth.timeout())
                .on_ready(|redirect_uri, state| {
                    eprintln!("Authorize with redirect_uri={redirect_uri} and state={state}");
                });
            let connector = Connector::new(token_store_from_config(config));
            let installer = FsSkillInstaller::from_registry()?;
            let preset = std::env::var(OAUTH_TOKEN_ENV).ok().map(SecretString::new);
            let state = onboard_google_drive(
                config,
                &resolver,
                &connector,
                &installer,
                preset,
                cancel,
            )
            .await?;
            print_json(&state)?;
        },
    }

    Ok(())
}
