pub mod auth;
pub mod clusters;
pub mod config_cmd;
pub mod util;

use kubecloud_core::App;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a service command to its handler.
pub async fn dispatch(
    cmd: Command,
    app: &App,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    match cmd {
        Command::Clusters(args) => clusters::handle(app, args, global, color).await,
        Command::Auth(args) => auth::handle(app, args, global).await,
        // Handled in main before an App exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
