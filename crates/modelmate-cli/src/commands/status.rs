//! Status command implementation.

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Report what the token file holds. Never contacts the server and never
/// modifies the file.
pub fn run(_args: StatusArgs, context: &Context) -> Result<()> {
    let pair = context
        .store
        .try_get()
        .context("Failed to read token file")?;

    output::field("Token file", &context.store.path().display().to_string());
    output::field("API", context.gateway.api_url().as_str());

    let Some(access) = pair.access else {
        output::field("Access token", "none");
        println!("Not logged in");
        return Ok(());
    };

    output::field("Access token", "present");
    match access.expires_at() {
        Some(expires_at) => {
            output::field("Expires", &expires_at.to_rfc3339());
            let valid = expires_at > Utc::now();
            output::field("Valid", if valid { "yes" } else { "no (expired)" });
        }
        None => output::field("Valid", "no (unreadable token)"),
    }
    output::field(
        "Refresh token",
        if pair.refresh.is_some() { "present" } else { "none" },
    );

    Ok(())
}
