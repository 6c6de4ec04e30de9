mod context;
mod render;
mod repl;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use context::Context;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vitals_core::config::AppConfig;
use vitals_core::types::{Gender, Metric, Period, ProfileUpdate, Registration};

#[derive(Parser)]
#[command(
    name = "vitals",
    about = "Terminal client for a personal health-tracking service",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/vitals/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Session(SessionCommand),

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Commands that talk to the service.
#[derive(Subcommand)]
enum SessionCommand {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        /// Prompted for when omitted; the prompt echoes what you type
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        birthday: NaiveDate,
        /// Masculino or Femenino
        #[arg(long)]
        gender: Gender,
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Prompted for when omitted; the prompt echoes what you type
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show today's dashboard
    Overview,

    /// Show one metric over a period
    History {
        #[arg(short, long)]
        metric: Metric,
        /// 1w, 1m, 3m, 6m or 1y
        #[arg(short, long, default_value = "1w")]
        period: Period,
    },

    /// Upload records from a JSON file
    Import {
        /// Record type understood by the service, e.g. steps
        #[arg(short = 't', long = "type")]
        import_type: String,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Update the signed-in user's profile
    Profile {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        birthday: NaiveDate,
        #[arg(long)]
        gender: Gender,
        #[arg(long, requires = "current_password")]
        new_password: Option<String>,
        #[arg(long)]
        current_password: Option<String>,
    },

    /// Start the interactive shell (default)
    Shell,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "vitals=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(api_base) = &cli.api_base {
        config.api.base_url = api_base.clone();
        config.validate()?;
    }

    let command = match cli.command {
        Some(Commands::Config { action }) => return handle_config_command(action, &config),
        Some(Commands::Session(command)) => command,
        None => SessionCommand::Shell,
    };

    // Signing out is local cleanup plus one request; it never needs the
    // stored user's profile.
    let ctx = match command {
        SessionCommand::Logout => Context::without_restore(config)?,
        _ => Context::connect(config).await?,
    };

    match command {
        SessionCommand::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => read_secret("Password (visible as you type): ")?,
            };
            ctx.login(&username, &password).await?;
        }
        SessionCommand::Register {
            email,
            username,
            birthday,
            gender,
            weight,
            height,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => read_secret("Password (visible as you type): ")?,
            };
            let registration = Registration {
                email,
                username,
                birthday,
                gender,
                password,
                current_weight: weight,
                current_height: height,
            };
            ctx.register(&registration).await?;
            println!("Registration successful! Sign in with `vitals login`.");
        }
        SessionCommand::Logout => ctx.logout().await,
        SessionCommand::Whoami => ctx.whoami(),
        SessionCommand::Overview => ctx.overview().await?,
        SessionCommand::History { metric, period } => ctx.history(metric, period).await?,
        SessionCommand::Import { import_type, file } => ctx.import(&import_type, &file).await?,
        SessionCommand::Profile {
            email,
            username,
            birthday,
            gender,
            new_password,
            current_password,
        } => {
            let update = ProfileUpdate {
                email,
                username,
                birthday,
                gender,
                new_password,
                current_password,
            };
            ctx.update_profile(&update).await?;
        }
        SessionCommand::Shell => repl::run(ctx).await?,
    }

    Ok(())
}

fn read_secret(label: &str) -> Result<String> {
    let mut rl = DefaultEditor::new()?;
    Ok(rl.readline(label)?.trim().to_string())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_and_session_commands_parse_apart() {
        let cli = Cli::try_parse_from(["vitals", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: Some(ConfigAction::Path)
            })
        ));

        let cli = Cli::try_parse_from(["vitals", "logout"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Session(SessionCommand::Logout))
        ));

        let cli = Cli::try_parse_from(["vitals", "--verbose"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_password_help_warns_about_echo() {
        let mut cmd = Cli::command();
        for name in ["login", "register"] {
            let help = cmd
                .find_subcommand_mut(name)
                .unwrap()
                .render_help()
                .to_string();
            assert!(help.contains("echoes"), "{}", help);
        }
    }
}
