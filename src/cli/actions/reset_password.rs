use crate::cli::globals::GlobalArgs;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
}

/// Request a password reset email.
/// # Errors
/// Returns an error if the email is rejected or no backend can send it.
pub async fn execute(args: Args) -> Result<()> {
    let authenticator = args.globals.authenticator()?;
    authenticator.request_password_reset(&args.email).await?;

    println!("If an account exists for {}, a reset link is on its way", args.email.trim());
    Ok(())
}
