//! Watch command - hot-reload the config and report each reload.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use console::{Style, style};
use ferry_config::{ConfigWatcher, ReloadEvent, RuntimeConfigCache};
use serde::Serialize;

use super::Context;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Quiet period before a burst of file changes triggers a reload
    #[arg(long, default_value_t = 750, value_name = "MS")]
    pub debounce_ms: u64,
}

/// One reload, as printed in `--json` mode.
#[derive(Debug, Serialize)]
struct ReloadLine {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let options = ctx.load_options();
    let cache = tokio::task::spawn_blocking(move || RuntimeConfigCache::new(options)).await??;

    let watcher =
        ConfigWatcher::new(cache.clone()).with_debounce(Duration::from_millis(args.debounce_ms));
    let (mut events, _handle) = watcher.watch()?;

    if !ctx.json_output {
        let dim = Style::new().dim();
        let current = cache.resolve();
        let path = cache
            .config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("{} {}", style("Watching").bold(), path);
        println!(
            "  {} {} / {}",
            dim.apply_to("current:"),
            current.config.llm_provider,
            current.config.llm_model
        );
        println!("  {}", dim.apply_to("Ctrl-C to stop"));
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                report(ctx, &cache, event)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn report(ctx: &Context, cache: &RuntimeConfigCache, event: ReloadEvent) -> Result<()> {
    let line = match event {
        ReloadEvent::Reloaded { loaded_at } => {
            let snapshot = cache.resolve();
            ReloadLine {
                event: "reloaded",
                loaded_at: Some(loaded_at),
                provider: Some(snapshot.config.llm_provider.clone()),
                model: Some(snapshot.config.llm_model.clone()),
                error: None,
            }
        }
        ReloadEvent::Failed { error } => ReloadLine {
            event: "failed",
            loaded_at: None,
            provider: None,
            model: None,
            error: Some(error),
        },
        ReloadEvent::Skipped => ReloadLine {
            event: "skipped",
            loaded_at: None,
            provider: None,
            model: None,
            error: None,
        },
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    match (line.event, line.error) {
        ("failed", Some(error)) => println!(
            "{} {} {}",
            Style::new().red().apply_to("✗"),
            style("reload failed, keeping previous config:").red(),
            error
        ),
        ("reloaded", _) => println!(
            "{} reloaded {} / {}",
            Style::new().green().apply_to("✓"),
            line.provider.unwrap_or_default(),
            line.model.unwrap_or_default()
        ),
        _ => println!("{}", Style::new().dim().apply_to("reload skipped")),
    }
    Ok(())
}
