pub mod backend;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_CONFIRM_PASSWORD: &str = "confirm-password";
pub const ARG_NAME: &str = "name";
pub const ARG_QUERY: &str = "query";
pub const ARG_PATH: &str = "path";

pub const CMD_LOGIN: &str = "login";
pub const CMD_SIGNUP: &str = "signup";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_STATUS: &str = "status";
pub const CMD_VERIFY: &str = "verify";
pub const CMD_RESET_PASSWORD: &str = "reset-password";

fn email_arg() -> Arg {
    Arg::new(ARG_EMAIL)
        .short('e')
        .long(ARG_EMAIL)
        .help("Institutional email address")
        .env("IMPULSE_EMAIL")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long(ARG_PASSWORD)
        .help("Account password")
        .env("IMPULSE_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn login() -> Command {
    Command::new(CMD_LOGIN)
        .about("Sign in and store the session")
        .arg(email_arg())
        .arg(password_arg())
        .arg(
            Arg::new(ARG_QUERY)
                .long(ARG_QUERY)
                .help("Query string of the login page, e.g. redirect=%2Fevents"),
        )
}

fn signup() -> Command {
    Command::new(CMD_SIGNUP)
        .about("Create an account")
        .arg(email_arg())
        .arg(password_arg())
        .arg(
            Arg::new(ARG_CONFIRM_PASSWORD)
                .long(ARG_CONFIRM_PASSWORD)
                .help("Password again")
                .env("IMPULSE_CONFIRM_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_NAME)
                .short('n')
                .long(ARG_NAME)
                .help("Display name"),
        )
}

fn status() -> Command {
    Command::new(CMD_STATUS)
        .about("Show the stored session, or the route guard's decision for a path")
        .arg(
            Arg::new(ARG_PATH)
                .long(ARG_PATH)
                .help("Protected path to check, e.g. /events"),
        )
}

fn reset_password() -> Command {
    Command::new(CMD_RESET_PASSWORD)
        .about("Send a password reset email")
        .arg(email_arg())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("impulse")
        .about("Impulse student events sign-in")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(login())
        .subcommand(signup())
        .subcommand(Command::new(CMD_LOGOUT).about("Clear the stored session"))
        .subcommand(status())
        .subcommand(Command::new(CMD_VERIFY).about("Check the stored token with the backend"))
        .subcommand(reset_password());

    let command = backend::with_args(command);
    logging::with_args(command)
}
