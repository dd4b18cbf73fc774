use crate::auth::{guard::paths, post_login_destination};
use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
    pub password: SecretString,
    /// Query string of the login page, carrying the redirect target.
    pub query: Option<String>,
}

/// Sign in and persist the session.
/// # Errors
/// Returns an error if validation, every backend, or the state file fails.
pub async fn execute(args: Args) -> Result<()> {
    let authenticator = args.globals.authenticator()?;

    let session = authenticator.login(&args.email, &args.password).await?;
    debug!(email_verified = session.email_verified, "session stored");

    println!("Logged in as {}", session.email);

    let destination = if session.email_verified {
        post_login_destination(args.query.as_deref())
    } else {
        paths::VERIFY_EMAIL.to_string()
    };
    println!("Continue to {destination}");

    Ok(())
}
