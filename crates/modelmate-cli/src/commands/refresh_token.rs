//! Refresh token command implementation.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(_args: RefreshTokenArgs, context: &Context) -> Result<()> {
    eprintln!("{}", "Refreshing access token...".dimmed());

    let access = context
        .gateway
        .refresh()
        .await
        .context("Failed to refresh session")?;

    output::success("Access token refreshed");
    if let Some(expires_at) = access.expires_at() {
        output::field("Expires", &expires_at.to_rfc3339());
    }

    Ok(())
}
