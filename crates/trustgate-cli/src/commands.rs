use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use trustgate_core::{ApiClient, ApiRequest, ApiResponse, ClientConfig, GuardDecision, User};

use crate::credentials::CredentialStore;

pub const USAGE: &str = "\
Usage: trustgate <command>

Commands:
  login [username] [--remember]   Log in (--remember keeps the password in the OS keychain)
  register <username>             Create an account and log in
  logout [--forget]               Log out (--forget drops the remembered password)
  whoami                          Show the current user
  refresh                         Renew the session
  get <path>                      GET a path and print the response
  post <path> [json]              POST a JSON body and print the response
  guard <path>                    Check whether a restricted route would be admitted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: Option<String>, remember: bool },
    Register { username: String },
    Logout { forget: bool },
    Whoami,
    Refresh,
    Get { path: String },
    Post { path: String, body: Option<String> },
    Guard { path: String },
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("No command given"))?;
        let flags: Vec<&str> = rest
            .iter()
            .map(String::as_str)
            .filter(|a| a.starts_with("--"))
            .collect();
        let positional: Vec<String> = rest
            .iter()
            .filter(|a| !a.starts_with("--"))
            .cloned()
            .collect();

        let command = match name.as_str() {
            "login" => Command::Login {
                username: positional.first().cloned(),
                remember: flags.contains(&"--remember"),
            },
            "register" => Command::Register {
                username: positional
                    .first()
                    .cloned()
                    .ok_or_else(|| anyhow!("register needs a username"))?,
            },
            "logout" => Command::Logout {
                forget: flags.contains(&"--forget"),
            },
            "whoami" => Command::Whoami,
            "refresh" => Command::Refresh,
            "get" => Command::Get {
                path: required_path(&positional)?,
            },
            "post" => Command::Post {
                path: required_path(&positional)?,
                body: positional.get(1).cloned(),
            },
            "guard" => Command::Guard {
                path: required_path(&positional)?,
            },
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }
}

fn required_path(positional: &[String]) -> Result<String> {
    let path = positional
        .first()
        .ok_or_else(|| anyhow!("A path is required"))?;
    if path.starts_with('/') {
        Ok(path.clone())
    } else {
        Ok(format!("/{}", path))
    }
}

pub async fn run(command: Command, client: &ApiClient, config: &mut ClientConfig) -> Result<()> {
    match command {
        Command::Login { username, remember } => {
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(name) => name,
                None => prompt_username()?,
            };
            let password = rpassword::prompt_password("Password: ")?;

            let user = client.session().login(&username, &password).await?;
            if remember {
                CredentialStore::store(&username, &password)?;
            }
            config.last_username = Some(username);
            config.save()?;

            print_notification(client);
            print_user(&user);
        }
        Command::Register { username } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }

            let user = client.session().register(&username, &password).await?;
            config.last_username = Some(username);
            config.save()?;

            print_notification(client);
            print_user(&user);
        }
        Command::Logout { forget } => {
            resume(client, config).await;
            let result = client.session().logout().await;
            if forget {
                if let Some(username) = config.last_username.take() {
                    CredentialStore::delete(&username)?;
                    config.save()?;
                }
            }
            result.context("Remote logout failed; the local session was cleared")?;
            println!("Logged out");
        }
        Command::Whoami => {
            let user = match resume(client, config).await {
                Some(user) => Some(user),
                None => client.session().restore().await,
            };
            match user {
                Some(user) => print_user(&user),
                None => println!("Not logged in"),
            }
        }
        Command::Refresh => {
            resume(client, config).await;
            match client.session().refresh_session().await? {
                Some(user) => print_user(&user),
                None => println!("Session refreshed, but no identity was returned"),
            }
        }
        Command::Get { path } => {
            resume(client, config).await;
            let response = client.send(ApiRequest::get(path)).await?;
            print_response(response)?;
        }
        Command::Post { path, body } => {
            let mut request = ApiRequest::post(path);
            if let Some(raw) = body {
                let value: serde_json::Value =
                    serde_json::from_str(&raw).context("Request body is not valid JSON")?;
                request = request.json(&value)?;
            }
            resume(client, config).await;
            let response = client.send(request).await?;
            print_response(response)?;
        }
        Command::Guard { path } => {
            resume(client, config).await;
            match client.check_route(&path) {
                GuardDecision::Allow => println!("allow {}", path),
                GuardDecision::Redirect(to) => println!("redirect {} -> {}", path, to),
            }
        }
    }
    Ok(())
}

/// Log back in with the remembered password, if there is one.
async fn resume(client: &ApiClient, config: &ClientConfig) -> Option<User> {
    let username = config.last_username.as_deref()?;
    let password = match CredentialStore::get_password(username) {
        Ok(password) => password,
        Err(e) => {
            debug!(error = %e, "No remembered password");
            return None;
        }
    };

    match client.session().login(username, &password).await {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(username = username, error = %e, "Automatic login failed");
            None
        }
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn print_notification(client: &ApiClient) {
    if let Some(message) = client.session().notifier().current() {
        eprintln!("{}", message);
    }
}

fn print_user(user: &User) {
    println!("{} (id {}, {})", user.username, user.id, user.role);
}

/// Print the body (pretty JSON when possible); non-2xx becomes an error
/// after printing so the exit code reflects it.
fn print_response(response: ApiResponse) -> Result<()> {
    eprintln!("{}", response.status());
    match response.json::<serde_json::Value>() {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", response.text()),
    }
    response.error_for_status()?;
    Ok(())
}
