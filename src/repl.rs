use crate::context::Context;
use crate::render;
use anyhow::{Context as _, Result};
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};
use std::path::Path;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use vitals_core::config::AppConfig;
use vitals_core::types::{Gender, Metric, Period, ProfileUpdate, Registration};
use vitals_core::{Route, SessionEvent, SessionEventKind, StatsState};

const BANNER: &str = r#"
  vitals: daily health dashboard

  Commands:
    /login <user>              Sign in (password prompt echoes input)
    /register                  Create an account
    /logout                    Sign out
    /whoami                    Show the signed-in user
    /overview                  Reload and show the dashboard
    /history <metric> [period] Show a metric over 1w, 1m, 3m, 6m or 1y
    /import <type> <file>      Upload records from a JSON file
    /profile                   Edit your profile
    /config                    Show current config
    /help                      Show this help
    /exit                      Quit
"#;

/// Run the interactive shell.
pub async fn run(ctx: Context) -> Result<()> {
    println!("{}", BANNER);
    println!("  Endpoint: {}", ctx.config.api.base_url);
    println!();

    let mut events = ctx.session.subscribe();

    // A session restored from disk lands straight on the dashboard.
    if ctx.signed_in() {
        show_dashboard(&ctx).await;
    }

    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        let who = ctx
            .session
            .current_user()
            .map(|u| u.display_name())
            .unwrap_or_else(|| "guest".into());
        let prompt = format!("\x1b[1;36m{}\x1b[0m \x1b[1;32m❯\x1b[0m ", who);

        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if !input.starts_with('/') {
                    println!("Type /help for available commands.");
                    continue;
                }
                match handle_command(input, &ctx, &mut rl).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("\x1b[0;31m{}\x1b[0m", e),
                }
                drain_events(&ctx, &mut events).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// React to the navigation requests published while a command ran.
async fn drain_events(ctx: &Context, events: &mut Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => match event.kind {
                SessionEventKind::Navigate {
                    route: Route::Dashboard,
                } => show_dashboard(ctx).await,
                SessionEventKind::Navigate {
                    route: Route::Login { notice },
                } => {
                    if let Some(notice) = notice {
                        println!("\x1b[0;32m{}\x1b[0m Sign in with /login <user>.", notice);
                    }
                }
                SessionEventKind::DetailsResolved { loaded: true, .. } => {
                    if let Some(user) = ctx.session.current_user() {
                        println!("Welcome, {}.", user.display_name());
                    }
                }
                _ => {}
            },
            Err(TryRecvError::Lagged(n)) => {
                tracing::debug!("Skipped {} session events", n);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

async fn show_dashboard(ctx: &Context) {
    match ctx.metrics.refresh_for(&ctx.session).await {
        StatsState::Success(snapshot) => print!("{}", render::overview(&snapshot.overview)),
        StatsState::Failure(message) => eprintln!("\x1b[0;31m{}\x1b[0m", message),
        StatsState::Idle | StatsState::Loading => {}
    }
}

fn prompt(rl: &mut DefaultEditor, label: &str, default: Option<&str>) -> Result<String> {
    let text = match default {
        Some(d) if !d.is_empty() => format!("  {} [{}]: ", label, d),
        _ => format!("  {}: ", label),
    };
    let answer = rl.readline(&text)?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(answer.to_string())
    }
}

fn prompt_parsed<T>(rl: &mut DefaultEditor, label: &str, default: Option<&str>) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let answer = prompt(rl, label, default)?;
    answer
        .parse()
        .map_err(|e| anyhow::anyhow!("{}: {}", label, e))
}

fn prompt_optional(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>> {
    let answer = prompt(rl, label, None)?;
    Ok(Some(answer).filter(|a| !a.is_empty()))
}

/// Handle a slash command. Returns `true` to continue the loop, `false` to exit.
async fn handle_command(input: &str, ctx: &Context, rl: &mut DefaultEditor) -> Result<bool> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let cmd = parts[0];
    let args = &parts[1..];

    match cmd {
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye!");
            return Ok(false);
        }
        "/login" => {
            let username = match args.first() {
                Some(u) => u.to_string(),
                None => prompt(rl, "Username", None)?,
            };
            let password = prompt(rl, "Password (visible as you type)", None)?;
            ctx.login(&username, &password).await?;
        }
        "/register" => {
            let registration = Registration {
                email: prompt(rl, "Email", None)?,
                username: prompt(rl, "Username", None)?,
                birthday: prompt_parsed(rl, "Birthday (YYYY-MM-DD)", None)?,
                gender: prompt_parsed::<Gender>(rl, "Gender (Masculino/Femenino)", None)?,
                password: prompt(rl, "Password (visible as you type)", None)?,
                current_weight: prompt_parsed(rl, "Weight (kg)", None)?,
                current_height: prompt_parsed(rl, "Height (cm)", None)?,
            };
            ctx.register(&registration).await?;
        }
        "/logout" => ctx.logout().await,
        "/whoami" => ctx.whoami(),
        "/overview" | "/refresh" => ctx.overview().await?,
        "/history" => {
            let Some(metric) = args.first() else {
                let names: Vec<&str> = Metric::ALL.iter().map(|m| m.as_str()).collect();
                println!("Usage: /history <metric> [period]  metrics: {}", names.join(", "));
                return Ok(true);
            };
            let metric: Metric = metric.parse().map_err(anyhow::Error::msg)?;
            let period: Period = match args.get(1) {
                Some(p) => p.parse().map_err(anyhow::Error::msg)?,
                None => Period::Week,
            };
            ctx.history(metric, period).await?;
        }
        "/import" => {
            let (Some(import_type), Some(file)) = (args.first(), args.get(1)) else {
                println!("Usage: /import <type> <file>");
                return Ok(true);
            };
            ctx.import(import_type, Path::new(file)).await?;
        }
        "/profile" => {
            let Some(user) = ctx.session.current_user() else {
                anyhow::bail!("Not signed in");
            };
            let email = user.get_str("email");
            let username = user.get_str("username");
            let birthday = user.get_str("birthday");
            let gender = user.get_str("gender");
            let update = ProfileUpdate {
                email: prompt(rl, "Email", email.as_deref())?,
                username: prompt(rl, "Username", username.as_deref())?,
                birthday: prompt_parsed(rl, "Birthday (YYYY-MM-DD)", birthday.as_deref())?,
                gender: prompt_parsed::<Gender>(rl, "Gender", gender.as_deref())?,
                new_password: prompt_optional(rl, "New password (blank to keep)")?,
                current_password: None,
            };
            let update = if update.new_password.is_some() {
                ProfileUpdate {
                    current_password: Some(prompt(rl, "Current password", None)?),
                    ..update
                }
            } else {
                update
            };
            ctx.update_profile(&update).await?;
        }
        "/config" => {
            let toml_str = toml::to_string_pretty(&ctx.config)
                .context("serializing config")?;
            println!("{}", toml_str);
        }
        "/help" | "/?" => println!("{}", BANNER),
        _ => {
            println!(
                "Unknown command: {}. Type /help for available commands.",
                cmd
            );
        }
    }

    Ok(true)
}
