use crate::auth::{SignupMetadata, guard::paths, validate_password_confirmation};
use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub display_name: Option<String>,
}

/// Create an account. The stored session is not touched.
/// # Errors
/// Returns an error if the passwords differ, the email is rejected, or every
/// backend fails.
pub async fn execute(args: Args) -> Result<()> {
    validate_password_confirmation(&args.password, &args.confirm_password)?;

    let metadata = args
        .display_name
        .map(SignupMetadata::with_display_name)
        .unwrap_or_default();

    let authenticator = args.globals.authenticator()?;
    let outcome = authenticator
        .signup(&args.email, &args.password, &metadata)
        .await?;

    println!("Account created with {}", outcome.provider);
    if outcome.requires_verification {
        println!(
            "Check your inbox to confirm your email, then continue to {}",
            paths::VERIFY_EMAIL
        );
    } else {
        println!("Continue to {}", paths::LOGIN);
    }

    Ok(())
}
