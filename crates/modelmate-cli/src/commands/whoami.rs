//! Whoami command implementation.

use anyhow::Result;
use clap::Args;

use crate::output;
use crate::session::Context;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the full profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, context: &Context) -> Result<()> {
    let controller = context.controller();
    controller.bootstrap().await;

    let Some(profile) = controller.user() else {
        println!("Not logged in");
        return Ok(());
    };

    if args.json {
        output::json_pretty(profile.as_value())?;
    } else {
        super::print_profile(&profile);
    }

    Ok(())
}
