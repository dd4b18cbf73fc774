//! Maps validated CLI matches to an [`Action`].

use crate::cli::actions::{
    Action, login, logout, reset_password, signup, status, verify,
};
use crate::cli::commands::{
    self, ARG_CONFIRM_PASSWORD, ARG_EMAIL, ARG_NAME, ARG_PASSWORD, ARG_PATH, ARG_QUERY,
    backend,
};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use secrecy::SecretString;

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

fn secret(matches: &ArgMatches, name: &str) -> Result<SecretString> {
    required(matches, name).map(SecretString::from)
}

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = GlobalArgs::new(backend::Options::parse(matches)?);

    let Some((name, sub)) = matches.subcommand() else {
        bail!("missing subcommand");
    };

    let action = match name {
        commands::CMD_LOGIN => Action::Login(login::Args {
            globals,
            email: required(sub, ARG_EMAIL)?,
            password: secret(sub, ARG_PASSWORD)?,
            query: sub.get_one::<String>(ARG_QUERY).cloned(),
        }),
        commands::CMD_SIGNUP => Action::Signup(signup::Args {
            globals,
            email: required(sub, ARG_EMAIL)?,
            password: secret(sub, ARG_PASSWORD)?,
            confirm_password: secret(sub, ARG_CONFIRM_PASSWORD)?,
            display_name: sub.get_one::<String>(ARG_NAME).cloned(),
        }),
        commands::CMD_LOGOUT => Action::Logout(logout::Args { globals }),
        commands::CMD_STATUS => Action::Status(status::Args {
            globals,
            path: sub.get_one::<String>(ARG_PATH).cloned(),
        }),
        commands::CMD_VERIFY => Action::Verify(verify::Args { globals }),
        commands::CMD_RESET_PASSWORD => Action::ResetPassword(reset_password::Args {
            globals,
            email: required(sub, ARG_EMAIL)?,
        }),
        other => bail!("unknown subcommand: {other}"),
    };

    Ok(action)
}
