//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod refresh_token;
pub mod register;
pub mod request;
pub mod status;
pub mod whoami;

use anyhow::Result;

use modelmate_core::UserProfile;

use crate::cli::Commands;
use crate::output;
use crate::session::Context;

pub async fn handle(command: Commands, context: &Context) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(args, context).await,
        Commands::Logout(args) => logout::run(args, context),
        Commands::Whoami(args) => whoami::run(args, context).await,
        Commands::Status(args) => status::run(args, context),
        Commands::RefreshToken(args) => refresh_token::run(args, context).await,
        Commands::Register(args) => register::run(args, context).await,
        Commands::Request(args) => request::run(args, context).await,
    }
}

/// Print the identifying fields of a profile.
fn print_profile(profile: &UserProfile) {
    if let Some(id) = profile.id() {
        output::field("ID", &id.to_string());
    }
    if let Some(username) = profile.username() {
        output::field("Username", username);
    }
    if let Some(email) = profile.email() {
        output::field("Email", email);
    }
}
