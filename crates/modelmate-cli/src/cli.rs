//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use modelmate_http::API_BASE_ENV;

use crate::commands::{login, logout, refresh_token, register, request, status, whoami};

/// Environment variable allowing plain HTTP to non-local API hosts.
pub const ALLOW_HTTP_ENV: &str = "MODELMATE_ALLOW_HTTP";

/// Environment variable overriding the token file location.
pub const TOKEN_FILE_ENV: &str = "MODELMATE_TOKEN_FILE";

/// ModelMate command-line client.
#[derive(Parser, Debug)]
#[command(name = "modelmate")]
#[command(author, version = env!("MODELMATE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// API base URL (HTTPS; plain HTTP only for localhost unless --allow-http)
    #[arg(long, env = API_BASE_ENV, global = true)]
    pub api: Option<String>,

    /// Allow a plain HTTP API base URL on any host
    #[arg(long, env = ALLOW_HTTP_ENV, global = true)]
    pub allow_http: bool,

    /// Token file (defaults to the user data directory)
    #[arg(long, env = TOKEN_FILE_ENV, global = true)]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with a username and password
    Login(login::LoginArgs),

    /// Sign out and forget the stored tokens
    Logout(logout::LogoutArgs),

    /// Display the signed-in user
    Whoami(whoami::WhoamiArgs),

    /// Inspect the stored tokens without contacting the server
    Status(status::StatusArgs),

    /// Exchange the refresh token for a new access token
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Create a new account
    Register(register::RegisterArgs),

    /// Send an authenticated request and print the JSON response
    Request(request::RequestArgs),
}
