//! Register command implementation.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use modelmate_core::Registration;
use modelmate_http::RegisterError;

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,

    /// Password again; defaults to --password
    #[arg(long)]
    pub password_confirm: Option<String>,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,
}

pub async fn run(args: RegisterArgs, context: &Context) -> Result<()> {
    let confirm = args
        .password_confirm
        .unwrap_or_else(|| args.password.clone());
    let registration = Registration::new(args.username, args.email, args.password, confirm)
        .with_name(args.first_name, args.last_name);

    eprintln!("{}", "Creating account...".dimmed());

    match context.controller().register(&registration).await {
        Ok(profile) => {
            output::success("Account created");
            println!();
            super::print_profile(&profile);
            output::hint("Run 'modelmate login' to sign in.");
            Ok(())
        }
        Err(RegisterError::Fields(fields)) => {
            for (field, messages) in &fields {
                output::error(&format!("{}: {}", field, messages.join(" ")));
            }
            bail!("Registration failed")
        }
        Err(RegisterError::Message(message)) => bail!("Registration failed: {}", message),
    }
}
