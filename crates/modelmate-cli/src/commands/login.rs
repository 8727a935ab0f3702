//! Login command implementation.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use modelmate_core::Credentials;

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(args: LoginArgs, context: &Context) -> Result<()> {
    let credentials = Credentials::new(args.username, args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let profile = context
        .controller()
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    super::print_profile(&profile);
    output::field("API", context.gateway.api_url().as_str());

    Ok(())
}
