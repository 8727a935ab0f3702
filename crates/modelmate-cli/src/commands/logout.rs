//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(_args: LogoutArgs, context: &Context) -> Result<()> {
    context.controller().logout();
    output::success("Logged out");
    Ok(())
}
