//! `stockroom-access` — inspect the client's route allow-list offline.
//!
//! Runs the same session gate the browser runs, against an in-memory store,
//! so answers match what a signed-in user would actually experience.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use stockroom_auth::{LinkInconsistency, Role, SessionUser};
use stockroom_session::{
    AccessDecision, GateConfig, InMemoryStorage, MemoryNavigator, SessionGate,
};

#[derive(Debug, Parser)]
#[command(name = "stockroom-access", about = "Inspect and audit the role allow-list")]
pub struct Cli {
    /// Gate configuration (JSON). Defaults to the built-in table.
    #[arg(long, env = "STOCKROOM_GATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the allow-list per role.
    Table,
    /// Show what happens when a signed-in user of ROLE opens PATH.
    Check { role: Role, path: String },
    /// Report in-app links a role's allow-list would bounce.
    ///
    /// LINKS is a JSON object mapping role to the paths its navigation links to.
    Audit { links: PathBuf },
}

#[derive(Debug, Serialize)]
struct CheckReport {
    role: Role,
    path: String,
    decision: AccessDecision,
    granted_by: Option<String>,
}

#[derive(Debug, Serialize)]
struct AuditReport {
    checked: usize,
    inconsistencies: Vec<LinkInconsistency>,
}

/// Execute `cli` and return the JSON document to print.
pub fn run(cli: Cli) -> anyhow::Result<String> {
    let config = load_config(cli.config.as_deref())?;

    let output = match cli.command {
        Command::Table => serde_json::to_string_pretty(&config.policy)?,
        Command::Check { role, path } => serde_json::to_string_pretty(&check(&config, role, &path)?)?,
        Command::Audit { links } => {
            let raw = std::fs::read_to_string(&links)
                .with_context(|| format!("failed to read links file {}", links.display()))?;
            let links: BTreeMap<Role, Vec<String>> =
                serde_json::from_str(&raw).context("links file is not a role → paths map")?;
            serde_json::to_string_pretty(&audit(&config, &links))?
        }
    };
    Ok(output)
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<GateConfig> {
    let Some(path) = path else {
        return Ok(GateConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read gate config {}", path.display()))?;
    let config = GateConfig::from_json(&raw)
        .with_context(|| format!("invalid gate config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded gate config");
    Ok(config)
}

fn check(config: &GateConfig, role: Role, path: &str) -> anyhow::Result<CheckReport> {
    let user = SessionUser::new(0, "stockroom-access", role);
    let storage = InMemoryStorage::new()
        .with_entry(config.user_key.clone(), user.to_json()?)
        .with_entry(config.token_key.clone(), "offline");

    let gate = SessionGate::new(
        config.clone(),
        Arc::new(storage),
        Arc::new(MemoryNavigator::new(path)),
    );
    gate.bootstrap()?;
    let decision = gate.evaluate(path)?;

    Ok(CheckReport {
        role,
        path: path.to_string(),
        decision,
        granted_by: config
            .policy
            .matching_prefix(role, path)
            .map(|prefix| prefix.to_string()),
    })
}

fn audit(config: &GateConfig, links: &BTreeMap<Role, Vec<String>>) -> AuditReport {
    let inconsistencies = config.policy.audit_links(links);
    for found in &inconsistencies {
        tracing::warn!(role = %found.role, path = %found.path, "link outside allow-list");
    }
    AuditReport {
        checked: links.values().map(Vec::len).sum(),
        inconsistencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_command() {
        let cli = Cli::try_parse_from(["stockroom-access", "check", "supplier", "/customers"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Check { role: Role::Supplier, ref path } if path == "/customers"
        ));
    }

    #[test]
    fn check_reports_redirect_for_denied_route() {
        let report = check(&GateConfig::default(), Role::Supplier, "/customers").unwrap();
        assert_eq!(report.decision, AccessDecision::RedirectToHome("/".into()));
        assert_eq!(report.granted_by, None);

        let report = check(&GateConfig::default(), Role::Supplier, "/orders/42").unwrap();
        assert_eq!(report.decision, AccessDecision::Allow);
        assert_eq!(report.granted_by.as_deref(), Some("/orders"));
    }

    #[test]
    fn audit_counts_links() {
        let links = BTreeMap::from([
            (Role::Supplier, vec!["/orders".to_string(), "/payments".to_string()]),
            (Role::Customer, vec!["/profile".to_string()]),
        ]);
        let report = audit(&GateConfig::default(), &links);
        assert_eq!(report.checked, 3);
        assert_eq!(report.inconsistencies.len(), 1);
        assert_eq!(report.inconsistencies[0].path, "/payments");
    }

    #[test]
    fn table_is_json() {
        let cli = Cli::try_parse_from(["stockroom-access", "table"]).unwrap();
        let output = run(cli).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(parsed.get("supplier").is_some());
    }
}
