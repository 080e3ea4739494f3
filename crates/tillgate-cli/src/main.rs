//! Tillgate - operator login for point-of-sale stations.
//!
//! Logs an operator in at this station, silently with remembered
//! credentials when possible, and carries a few commands to manage the
//! operator accounts file.

mod prompt;

use std::io;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tillgate_core::auth::{
    AuthenticationSession, CookieStore, FileCookieStore, JsonCredentialStore, KeyringCookieStore,
};
use tillgate_core::config::CookieBackend;
use tillgate_core::models::UserProfile;
use tillgate_core::{Config, LoginError};

use prompt::TerminalPrompt;

// ============================================================================
// Constants
// ============================================================================

const USAGE: &str = "\
Usage: tillgate [OPTIONS]
       tillgate COMMAND

Options:
  --username NAME            Log in as NAME; the username cannot be changed
  --no-cookie                Do not log in with remembered credentials

Commands:
  --forget                   Forget remembered credentials
  --add-user NAME [PROFILE]  Create an operator account
  --add-profile NAME [PERMS] Create a profile; PERMS is comma separated
  --set-password NAME        Change the password of an operator
  --set-branches NAME [BRS]  Restrict an operator to branches; BRS is comma
                             separated, none lifts the restriction
  --deactivate NAME          Disable an operator account
  --history NAME             Show the logins of an operator
  --help                     Show this message";

/// Exit code for command line mistakes
const USAGE_EXIT_CODE: u8 = 2;

/// Log directory inside the data directory
const LOG_DIR: &str = "logs";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login {
        username: Option<String>,
        use_cookie: bool,
    },
    Forget,
    AddUser {
        username: String,
        profile: Option<String>,
    },
    AddProfile {
        name: String,
        permissions: Vec<String>,
    },
    SetPassword(String),
    SetBranches {
        username: String,
        branches: Vec<String>,
    },
    Deactivate(String),
    History(String),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut username = None;
    let mut use_cookie = true;
    let mut iter = args.iter();

    // Commands take the whole command line
    let rest = |iter: &mut std::slice::Iter<'_, String>| -> Vec<String> { iter.cloned().collect() };

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--username" => {
                let name = iter.next().ok_or("--username needs a value")?;
                username = Some(name.clone());
            }
            "--no-cookie" => use_cookie = false,
            "--help" | "-h" => return Ok(Command::Help),
            "--forget" => {
                return match rest(&mut iter).as_slice() {
                    [] => Ok(Command::Forget),
                    _ => Err("--forget takes no arguments".to_string()),
                }
            }
            "--add-user" => {
                return match rest(&mut iter).as_slice() {
                    [name] => Ok(Command::AddUser {
                        username: name.clone(),
                        profile: None,
                    }),
                    [name, profile] => Ok(Command::AddUser {
                        username: name.clone(),
                        profile: Some(profile.clone()),
                    }),
                    _ => Err("--add-user needs NAME and an optional PROFILE".to_string()),
                }
            }
            "--add-profile" => {
                return match rest(&mut iter).as_slice() {
                    [name] => Ok(Command::AddProfile {
                        name: name.clone(),
                        permissions: Vec::new(),
                    }),
                    [name, perms] => Ok(Command::AddProfile {
                        name: name.clone(),
                        permissions: split_list(perms),
                    }),
                    _ => Err("--add-profile needs NAME and optional PERMS".to_string()),
                }
            }
            "--set-password" => {
                return match rest(&mut iter).as_slice() {
                    [name] => Ok(Command::SetPassword(name.clone())),
                    _ => Err("--set-password needs NAME".to_string()),
                }
            }
            "--set-branches" => {
                return match rest(&mut iter).as_slice() {
                    [name] => Ok(Command::SetBranches {
                        username: name.clone(),
                        branches: Vec::new(),
                    }),
                    [name, branches] => Ok(Command::SetBranches {
                        username: name.clone(),
                        branches: split_list(branches),
                    }),
                    _ => Err("--set-branches needs NAME and optional BRANCHES".to_string()),
                }
            }
            "--deactivate" => {
                return match rest(&mut iter).as_slice() {
                    [name] => Ok(Command::Deactivate(name.clone())),
                    _ => Err("--deactivate needs NAME".to_string()),
                }
            }
            "--history" => {
                return match rest(&mut iter).as_slice() {
                    [name] => Ok(Command::History(name.clone())),
                    _ => Err("--history needs NAME".to_string()),
                }
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(Command::Login {
        username,
        use_cookie,
    })
}

/// Split a comma separated list, dropping empty items
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr and to a daily log file in the data directory. The
/// returned guard flushes the file writer when dropped.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = config.data_dir().ok().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("tillgate")
            .filename_suffix("log")
            .build(dir.join(LOG_DIR))
            .ok()
    });
    let (file_layer, guard) = match file_appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(command) => command,
        Err(msg) => {
            eprintln!("Error: {}\n\n{}", msg, USAGE);
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    config.apply_env();

    let _guard = init_tracing(&config);
    info!(station = %config.station(), "Tillgate starting");

    match run(command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Tillgate failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Login {
            username,
            use_cookie,
        } => login(config, username, use_cookie),
        Command::Forget => {
            open_cookie_store(config)?
                .clear()
                .context("Failed to forget remembered credentials")?;
            println!("Remembered credentials cleared");
            Ok(())
        }
        Command::AddUser { username, profile } => add_user(config, &username, profile.as_deref()),
        Command::AddProfile { name, permissions } => {
            let mut store = JsonCredentialStore::open(config.users_path()?)?;
            store.add_profile(UserProfile {
                name: name.clone(),
                permissions,
            });
            store.save()?;
            println!("Profile '{}' saved", name);
            Ok(())
        }
        Command::SetPassword(username) => {
            let mut store = JsonCredentialStore::open(config.users_path()?)?;
            let password = read_new_password()?;
            store.set_password(&username, &password)?;
            store.save()?;
            println!("Password of '{}' changed", username);
            Ok(())
        }
        Command::SetBranches { username, branches } => {
            let mut store = JsonCredentialStore::open(config.users_path()?)?;
            let summary = if branches.is_empty() {
                "all branches".to_string()
            } else {
                branches.join(", ")
            };
            store.set_branches(&username, branches)?;
            store.save()?;
            println!("User '{}' may log in at {}", username, summary);
            Ok(())
        }
        Command::Deactivate(username) => {
            let mut store = JsonCredentialStore::open(config.users_path()?)?;
            store.deactivate_user(&username)?;
            store.save()?;
            println!("User '{}' deactivated", username);
            Ok(())
        }
        Command::History(username) => {
            let store = JsonCredentialStore::open(config.users_path()?)?;
            let logins = store.logins_for(&username);
            if logins.is_empty() {
                println!("No logins recorded for '{}'", username);
            }
            for login in logins {
                println!(
                    "{}  {}",
                    login.logged_in_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    login.station
                );
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn open_cookie_store(config: &Config) -> Result<Box<dyn CookieStore>> {
    let store: Box<dyn CookieStore> = match config.cookie_backend {
        CookieBackend::File => Box::new(FileCookieStore::new(config.cookie_path()?)),
        CookieBackend::Keyring => {
            Box::new(KeyringCookieStore::new().context("Failed to open keychain")?)
        }
    };
    Ok(store)
}

/// Open the accounts file, seeding the default admin into a new install.
fn open_credentials(config: &Config) -> Result<JsonCredentialStore> {
    let mut store = JsonCredentialStore::open(config.users_path()?)?;
    if store.ensure_admin()? {
        store.save()?;
        println!("Created account 'admin' with an empty password");
    }
    Ok(store)
}

fn login(config: &Config, username: Option<String>, use_cookie: bool) -> Result<()> {
    let forced = username.or_else(|| std::env::var("TILLGATE_USERNAME").ok());
    let try_cookie = use_cookie && forced.is_none();

    let mut session = AuthenticationSession::new(
        open_credentials(config)?,
        open_cookie_store(config)?,
        config.station(),
    )
    .with_cookies_disabled(config.disable_cookies)
    .with_forced_username(forced);

    let cookie_user = if try_cookie { session.cookie_login() } else { None };
    let user = match cookie_user {
        Some(user) => Some(user),
        None => {
            let mut prompt = TerminalPrompt::new(config.last_username.clone());
            match session.validate_user(&mut prompt) {
                Ok(user) => user,
                Err(LoginError::QuitRequested) => {
                    info!("Quit requested at login");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let Some(user) = user else {
        println!("Login cancelled");
        return Ok(());
    };

    println!(
        "Logged in as {} ({}) at {}",
        user.username(),
        user.profile().name,
        user.station()
    );

    if let Err(e) = Config::save_last_username(user.username()) {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

fn add_user(config: &Config, username: &str, profile: Option<&str>) -> Result<()> {
    let mut store = JsonCredentialStore::open(config.users_path()?)?;

    let password = read_new_password()?;
    store.add_user(username, &password, profile)?;
    store.save()?;
    println!("User '{}' created", username.trim());
    Ok(())
}

/// Read a password twice from the terminal
fn read_new_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Repeat password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_default_is_login() {
        assert_eq!(
            parse_args(&[]).unwrap(),
            Command::Login {
                username: None,
                use_cookie: true
            }
        );
    }

    #[test]
    fn test_parse_args_login_options() {
        assert_eq!(
            parse_args(&args(&["--no-cookie", "--username", "maria"])).unwrap(),
            Command::Login {
                username: Some("maria".to_string()),
                use_cookie: false
            }
        );
        assert!(parse_args(&args(&["--username"])).is_err());
    }

    #[test]
    fn test_parse_args_commands() {
        assert_eq!(parse_args(&args(&["--forget"])).unwrap(), Command::Forget);
        assert_eq!(
            parse_args(&args(&["--add-user", "maria", "Salesperson"])).unwrap(),
            Command::AddUser {
                username: "maria".to_string(),
                profile: Some("Salesperson".to_string())
            }
        );
        assert_eq!(
            parse_args(&args(&["--add-profile", "Manager", "pos, reports,,till"])).unwrap(),
            Command::AddProfile {
                name: "Manager".to_string(),
                permissions: vec!["pos".to_string(), "reports".to_string(), "till".to_string()]
            }
        );
        assert_eq!(
            parse_args(&args(&["--deactivate", "joao"])).unwrap(),
            Command::Deactivate("joao".to_string())
        );
        assert_eq!(
            parse_args(&args(&["--history", "joao"])).unwrap(),
            Command::History("joao".to_string())
        );
        assert_eq!(parse_args(&args(&["-h"])).unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_args_account_updates() {
        assert_eq!(
            parse_args(&args(&["--set-password", "maria"])).unwrap(),
            Command::SetPassword("maria".to_string())
        );
        assert_eq!(
            parse_args(&args(&["--set-branches", "maria", "Downtown, Harbor"])).unwrap(),
            Command::SetBranches {
                username: "maria".to_string(),
                branches: vec!["Downtown".to_string(), "Harbor".to_string()]
            }
        );
        assert_eq!(
            parse_args(&args(&["--set-branches", "maria"])).unwrap(),
            Command::SetBranches {
                username: "maria".to_string(),
                branches: Vec::new()
            }
        );
        assert!(parse_args(&args(&["--set-password"])).is_err());
        assert!(parse_args(&args(&["--set-branches", "a", "b", "c"])).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["--forget", "extra"])).is_err());
        assert!(parse_args(&args(&["--add-user"])).is_err());
        assert!(parse_args(&args(&["--deactivate", "a", "b"])).is_err());
    }
}
