use crate::cli::actions::{
    Action, login, logout, reset_password, signup, status, verify,
};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::Signup(args) => signup::execute(args).await,
        Action::Logout(args) => logout::execute(args).await,
        Action::Status(args) => status::execute(args).await,
        Action::Verify(args) => verify::execute(args).await,
        Action::ResetPassword(args) => reset_password::execute(args).await,
    }
}
