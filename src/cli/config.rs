//! t0 config command implementation
//!
//! Prints the resolved configuration as TOML with secrets redacted.

use super::Context;
use crate::error::Result;
use crate::output::emit_success;

pub fn run(ctx: Context) -> Result<()> {
    let shown = ctx.config.redacted();

    if ctx.output.json {
        return emit_success(ctx.output, "config", &shown, None);
    }
    if ctx.output.quiet {
        return Ok(());
    }

    let source = match &ctx.config_path {
        Some(path) if path.exists() => path.display().to_string(),
        Some(path) => format!("defaults ({} not found)", path.display()),
        None => "defaults".to_string(),
    };
    println!("# config: {source}");
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
