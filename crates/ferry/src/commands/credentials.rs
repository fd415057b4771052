//! Credentials command - CLI credentials visible to the resolver.

use anyhow::Result;
use console::{Style, style};
use ferry_config::{CliCredential, CliCredentials};
use serde::Serialize;

use super::{Context, redact};

/// A discovered credential with its key redacted.
#[derive(Debug, Serialize)]
struct CredentialRow<'a> {
    #[serde(flatten)]
    credential: &'a CliCredential,
    key: String,
}

pub async fn run(ctx: &Context) -> Result<()> {
    let options = ctx.load_options();
    let found: CliCredentials =
        tokio::task::spawn_blocking(move || ferry_config::load_cli_credentials(&options)).await?;

    let rows: Vec<CredentialRow<'_>> = found
        .iter()
        .map(|credential| CredentialRow {
            credential,
            key: redact(&credential.api_key),
        })
        .collect();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("CLI Credentials").bold());
    println!("{}", dim.apply_to("─".repeat(60)));

    if rows.is_empty() {
        println!("  {}", dim.apply_to("none found"));
        println!();
        return Ok(());
    }

    for row in &rows {
        let cred = row.credential;
        let state = if cred.stale {
            Style::new().yellow().apply_to("stale")
        } else {
            Style::new().green().apply_to("ok")
        };
        println!(
            "  {:<12} {:<18} {:<6} {}",
            style(&cred.provider).cyan(),
            cred.source.as_str(),
            state,
            row.key
        );
        if let Some(base_url) = &cred.base_url {
            println!("      {} {}", dim.apply_to("base url:"), base_url);
        }
        if let Some(model) = &cred.model {
            println!("      {} {}", dim.apply_to("model:   "), model);
        }
        if ctx.verbose
            && let Some(account) = &cred.account_id
        {
            println!("      {} {}", dim.apply_to("account: "), account);
        }
    }
    println!();

    Ok(())
}
