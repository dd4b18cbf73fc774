use crate::cli::globals::GlobalArgs;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Clear the stored session. Succeeds when already logged out.
/// # Errors
/// Returns an error if the state file cannot be read.
pub async fn execute(args: Args) -> Result<()> {
    let authenticator = args.globals.authenticator()?;
    authenticator.logout().await;

    println!("Logged out");
    Ok(())
}
