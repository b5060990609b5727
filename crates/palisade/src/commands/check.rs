//! Check command - validates the configuration without binding anything.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Config file (default: ./palisade.toml, then the user config dir)
    #[arg(short, long, env = "PALISADE_CONFIG")]
    pub config: Option<PathBuf>,
}

pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let loaded = palisade_config::load_config(args.config.as_deref())
        .context("Invalid configuration")?;

    println!("Config: {}", loaded.source.display());
    for warning in &loaded.warnings {
        println!("  warning: {}", warning);
    }

    for profile in &loaded.profiles {
        let welcome = if profile.has_welcome_page() {
            ", welcome page"
        } else {
            ""
        };
        println!(
            "  {:<16} {:<22} {}{}",
            profile.name, profile.bind_address, profile.destination, welcome
        );

        if ctx.verbose {
            println!("      authorize: {}", profile.oauth.authorize_endpoint);
            println!("      token:     {}", profile.oauth.token_endpoint);
            println!("      redirect:  {}", profile.oauth.redirect_uri);
            println!("      scopes:    {}", profile.oauth.scopes.join(" "));
            println!("      timeout:   {}s", profile.request_timeout.as_secs());
        }
    }

    println!("{} profile(s) OK", loaded.profiles.len());
    Ok(())
}
