pub mod login;
pub mod logout;
pub mod reset_password;
pub mod signup;
pub mod status;
pub mod verify;

// Internal "interpreter" for `Action`, kept apart so this file only lists variants.
mod run;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Signup(signup::Args),
    Logout(logout::Args),
    Status(status::Args),
    Verify(verify::Args),
    ResetPassword(reset_password::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
