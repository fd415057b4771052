//! Path command - which config file would be loaded.

use std::path::PathBuf;

use anyhow::Result;
use console::Style;
use serde::Serialize;

use super::Context;

#[derive(Debug, Serialize)]
struct PathOutput {
    path: Option<PathBuf>,
    exists: bool,
}

pub fn run(ctx: &Context) -> Result<()> {
    let path = ctx.load_options().config_path();
    let exists = path.as_deref().is_some_and(|p| p.is_file());

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&PathOutput { path, exists })?);
        return Ok(());
    }

    let dim = Style::new().dim();
    match path {
        Some(path) if exists => println!("{}", path.display()),
        Some(path) => println!("{} {}", path.display(), dim.apply_to("(not found)")),
        None => println!("{}", dim.apply_to("no home directory; set FERRY_CONFIG_PATH")),
    }
    Ok(())
}
