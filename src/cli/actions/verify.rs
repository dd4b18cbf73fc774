use crate::cli::globals::GlobalArgs;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Check the stored token with the backends.
/// # Errors
/// Returns an error if there is no session or the token is not accepted.
pub async fn execute(args: Args) -> Result<()> {
    let authenticator = args.globals.authenticator()?;
    let session = authenticator.verify().await?;

    println!("Token valid for {}", session.email);
    if !session.email_verified {
        println!("Email not verified yet");
    }

    Ok(())
}
