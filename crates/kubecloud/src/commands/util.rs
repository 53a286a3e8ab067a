//! Shared helpers for command handlers.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use tracing::debug;

use kubecloud_core::validation::{FieldValidation, format_validation_errors, validate_form};
use kubecloud_core::{App, Cluster, ClusterStatus, LoadingTracker, RetryPolicy, with_retry};

use crate::cli::{GlobalOpts, WaitArgs};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Read a password from `env_var` when given, otherwise prompt.
pub fn read_password(env_var: Option<&str>) -> Result<SecretString, CliError> {
    let password = match env_var {
        Some(var) => std::env::var(var).map_err(|_| CliError::Validation {
            reason: format!("environment variable {var} is not set"),
        })?,
        None => rpassword::prompt_password("Password: ")?,
    };
    Ok(SecretString::from(password))
}

/// Prompt for a line of text.
pub fn prompt_text(label: &str) -> Result<String, CliError> {
    dialoguer::Input::new()
        .with_prompt(label)
        .interact_text()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Run the validation engine over a form, failing with every message.
pub fn check_form(fields: &IndexMap<String, FieldValidation>) -> Result<(), CliError> {
    let result = validate_form(fields);
    if result.is_valid {
        Ok(())
    } else {
        Err(CliError::Validation {
            reason: format_validation_errors(&result.errors),
        })
    }
}

/// Retry policy for read requests, from `--attempts`.
pub fn read_policy(global: &GlobalOpts) -> RetryPolicy {
    RetryPolicy {
        max_attempts: global.attempts,
        ..RetryPolicy::default()
    }
}

/// Make sure the cluster collection is populated before an id-based action.
///
/// Mock mode seeds locally; otherwise the list is fetched.
pub async fn ensure_clusters(app: &App, global: &GlobalOpts) -> Result<(), CliError> {
    let clusters = app.clusters();
    if clusters.initialize()? || !clusters.clusters().is_empty() {
        return Ok(());
    }
    debug!("cluster collection empty, fetching");
    with_retry(read_policy(global), || clusters.fetch_clusters()).await?;
    Ok(())
}

/// Block until `id` settles into `target`, or fail if it lands in `error`.
///
/// Progress is tracked through a [`LoadingTracker`] and rendered as a
/// spinner on stderr.
pub async fn wait_for_status(
    app: &App,
    id: &str,
    target: ClusterStatus,
    wait: WaitArgs,
    quiet: bool,
) -> Result<Arc<Cluster>, CliError> {
    let tracker = LoadingTracker::new(format!("Waiting for {id}"));
    let spinner = Spinner::attach(&tracker, quiet);
    let mut stream = app.clusters().subscribe();
    let limit = Duration::from_secs(wait.wait_timeout);

    let result = tracker
        .with_loading(
            async {
                let settled = tokio::time::timeout(
                    limit,
                    stream.wait_until(|clusters| {
                        clusters.iter().any(|c| {
                            c.id == id && (c.status == target || c.status == ClusterStatus::Error)
                        })
                    }),
                )
                .await
                .map_err(|_| CliError::Timeout {
                    what: format!("Waiting for {id}"),
                    millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })?;

                let cluster = settled
                    .and_then(|snap| snap.iter().find(|c| c.id == id).cloned())
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "cluster".into(),
                        identifier: id.into(),
                        list_command: "clusters list".into(),
                    })?;
                if cluster.status == ClusterStatus::Error {
                    return Err(CliError::ClusterFailed { id: id.into() });
                }
                Ok(cluster)
            },
            Some(&format!("Waiting for {id} to become {target}")),
            Some(&format!("{id} is {target}")),
        )
        .await;

    spinner.finish(&tracker);
    result
}

// ── Spinner ──────────────────────────────────────────────────────────

/// Mirrors a [`LoadingTracker`]'s message onto an `indicatif` spinner.
struct Spinner {
    bar: ProgressBar,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    fn attach(tracker: &LoadingTracker, quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
                task: None,
            };
        }

        let bar = ProgressBar::new_spinner().with_style(ProgressStyle::default_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(tracker.state().message);

        let mut rx = tracker.subscribe();
        let mirror = bar.clone();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let message = rx.borrow_and_update().message.clone();
                mirror.set_message(message);
            }
        });
        Self {
            bar,
            task: Some(task),
        }
    }

    fn finish(self, tracker: &LoadingTracker) {
        if let Some(task) = self.task {
            task.abort();
        }
        let state = tracker.state();
        match state.error {
            Some(error) => self.bar.abandon_with_message(error),
            None => self.bar.finish_with_message(state.message),
        }
    }
}
