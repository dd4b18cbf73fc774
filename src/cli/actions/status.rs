use crate::auth::{Access, RouteGuard};
use crate::cli::globals::GlobalArgs;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    /// Protected path to run through the route guard.
    pub path: Option<String>,
}

/// Print the stored session, or the guard's decision for a path.
/// # Errors
/// Returns an error if the state file cannot be read.
pub async fn execute(args: Args) -> Result<()> {
    let session = args.globals.session()?;
    let mut updates = session.subscribe();

    if let Some(path) = args.path {
        let guard = RouteGuard::default();
        match guard.wait_until_ready(&path, &mut updates).await {
            Access::Granted => println!("{path}: allowed"),
            Access::Redirect(target) => println!("{path}: redirect to {target}"),
            Access::Pending => println!("{path}: session still loading"),
        }
        return Ok(());
    }

    let state = session.snapshot();
    if state.is_authenticated() {
        println!("Logged in as {}", state.session.email);
    } else {
        println!("Not logged in");
    }

    Ok(())
}
