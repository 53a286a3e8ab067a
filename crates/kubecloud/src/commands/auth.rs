//! Session command handlers.

use std::sync::Arc;

use indexmap::IndexMap;
use secrecy::ExposeSecret;
use tabled::Tabled;

use kubecloud_core::validation::{FieldValidation, Rules};
use kubecloud_core::{App, NotificationOptions, ProfileUpdate, Registration, User};

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
}

impl From<&Arc<User>> for UserRow {
    fn from(u: &Arc<User>) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role.to_string(),
        }
    }
}

fn detail(user: &Arc<User>) -> String {
    output::detail_block(&[
        ("ID", user.id.clone()),
        ("Name", user.name.clone()),
        ("Email", user.email.clone()),
        ("Role", user.role.to_string()),
        ("Avatar", user.avatar.clone().unwrap_or_default()),
        (
            "Last login",
            user.last_login
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_default(),
        ),
    ])
}

fn print_user(user: &Arc<User>, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, user, detail, |u| u.email.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn require_user(app: &App) -> Result<Arc<User>, CliError> {
    app.session().current_user().ok_or_else(|| CliError::Session {
        message: "Not logged in".into(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(app: &App, args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = app.session();
    let notes = app.notifications();

    match args.command {
        AuthCommand::Login {
            email,
            password_env,
        } => {
            let email = match email {
                Some(email) => email,
                None => util::prompt_text("Email")?,
            };
            let mut form = IndexMap::new();
            form.insert(
                "email".to_owned(),
                FieldValidation::new(email.as_str(), Rules::preset_email()).named("Email"),
            );
            util::check_form(&form)?;

            let password = util::read_password(password_env.as_deref())?;
            let user = session.login(&email, &password).await?;
            notes.success(
                "Signed in",
                format!("Welcome back, {}", user.name),
                NotificationOptions::default(),
            );
            print_user(&user, global)
        }

        AuthCommand::Register {
            name,
            email,
            password_env,
        } => {
            let password = util::read_password(password_env.as_deref())?;
            let mut form = IndexMap::new();
            form.insert(
                "name".to_owned(),
                FieldValidation::new(name.as_str(), Rules::preset_required().min_length(2))
                    .named("Name"),
            );
            form.insert(
                "email".to_owned(),
                FieldValidation::new(email.as_str(), Rules::preset_email()).named("Email"),
            );
            form.insert(
                "password".to_owned(),
                FieldValidation::new(password.expose_secret(), Rules::preset_password())
                    .named("Password"),
            );
            util::check_form(&form)?;

            let registration = Registration {
                name: kubecloud_core::validation::sanitize_input(&name),
                email,
                password,
            };
            let user = session.register(&registration).await?;
            notes.success(
                "Account created",
                user.email.clone(),
                NotificationOptions::default(),
            );
            print_user(&user, global)
        }

        AuthCommand::Logout => {
            let was_logged_in = session.is_logged_in();
            session.logout()?;
            if was_logged_in {
                notes.info("Signed out", "", NotificationOptions::default());
            }
            Ok(())
        }

        AuthCommand::Whoami => {
            let user = require_user(app)?;
            if global.output == OutputFormat::Table {
                let out = output::render_list(
                    global.output,
                    std::slice::from_ref(&user),
                    |u| UserRow::from(u),
                    |u| u.email.clone(),
                )?;
                output::print_output(&out, global.quiet);
                Ok(())
            } else {
                print_user(&user, global)
            }
        }

        AuthCommand::Profile {
            name,
            email,
            avatar,
        } => {
            let update = ProfileUpdate {
                name: name.map(|n| kubecloud_core::validation::sanitize_input(&n)),
                email,
                avatar,
            };
            if update.is_empty() {
                return Err(CliError::Validation {
                    reason: "nothing to update; pass at least one of --name, --email, --avatar"
                        .into(),
                });
            }
            let mut form = IndexMap::new();
            if let Some(ref email) = update.email {
                form.insert(
                    "email".to_owned(),
                    FieldValidation::new(email.as_str(), Rules::preset_email()).named("Email"),
                );
            }
            if let Some(ref avatar) = update.avatar {
                form.insert(
                    "avatar".to_owned(),
                    FieldValidation::new(avatar.as_str(), Rules::preset_url()).named("Avatar"),
                );
            }
            util::check_form(&form)?;

            require_user(app)?;
            let user = session.update_profile(&update).await?;
            notes.success("Profile updated", "", NotificationOptions::default());
            print_user(&user, global)
        }

        AuthCommand::Refresh => {
            session.refresh_token().await?;
            notes.success("Session refreshed", "", NotificationOptions::default());
            Ok(())
        }
    }
}
