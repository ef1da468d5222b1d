//! # Permission evaluation CLI
//!
//! Loads a role catalog and evaluates a single permission check, printing
//! the decision as JSON on stdout.
//!
//! ```text
//! authz-eval --catalog roles.json --role editor --resource content --action update \
//!     --context '{"ticket": {"status": "open"}}'
//! ```
//!
//! ## Exit codes
//!
//! - `0` - allowed (or `--actions` listing printed)
//! - `1` - denied
//! - `2` - catalog, context or configuration error
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG` - Log level (default: info)
//! - `AUTHZ_*` - Engine overrides, see `EngineConfig::from_env`

use anyhow::{Context, Result};
use clap::Parser;
use console_authz::{
    Action, EngineConfig, PermissionContext, PermissionEngine, RoleRegistry, User,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "authz-eval", version, about = "Evaluate a console permission check")]
struct Cli {
    /// Path to the JSON role catalog
    #[arg(long)]
    catalog: PathBuf,

    /// Role id of the user
    #[arg(long)]
    role: String,

    /// Resource being accessed (e.g. "billing.invoices")
    #[arg(long)]
    resource: String,

    /// Action to check; required unless --actions is given
    #[arg(long, required_unless_present = "actions")]
    action: Option<String>,

    /// Per-call context as a JSON object
    #[arg(long)]
    context: Option<String>,

    /// User id recorded in the audit trail
    #[arg(long, default_value = "cli")]
    user: String,

    /// List the actions available on the resource instead of checking one
    #[arg(long)]
    actions: bool,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    user: &'a str,
    role: &'a str,
    resource: &'a str,
    action: &'a Action,
    granted: bool,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Serialize)]
struct ActionsOutput<'a> {
    user: &'a str,
    role: &'a str,
    resource: &'a str,
    actions: Vec<Action>,
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the check was allowed
fn run(cli: &Cli) -> Result<bool> {
    info!("Starting authz-eval v{}", console_authz::VERSION);

    let registry = RoleRegistry::from_path(&cli.catalog)
        .with_context(|| format!("failed to load catalog {}", cli.catalog.display()))?;
    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let engine = PermissionEngine::new(registry, config);

    let context = cli
        .context
        .as_deref()
        .map(serde_json::from_str::<PermissionContext>)
        .transpose()
        .context("--context must be a JSON object")?;

    let user = User::new(cli.user.as_str(), cli.role.as_str());

    if cli.actions {
        let output = ActionsOutput {
            user: &user.id,
            role: &user.role,
            resource: &cli.resource,
            actions: engine
                .available_actions(&user, &cli.resource, context.as_ref())
                .into_iter()
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(true);
    }

    let action = Action::new(cli.action.as_deref().unwrap_or_default());
    let decision = engine.check_decision(&user, &cli.resource, &action, context.as_ref());

    let output = CheckOutput {
        user: &user.id,
        role: &user.role,
        resource: &cli.resource,
        action: &action,
        granted: decision.granted,
        source: decision.source.to_string(),
        reason: decision.reason,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(decision.granted)
}
