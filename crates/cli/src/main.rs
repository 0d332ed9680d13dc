//! YepCode CLI - run code snippets and manage team variables from the terminal

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yepcode_core::application::language::score;
use yepcode_sdk::{
    ApiConfig, ExecutionEvents, ExecutionSettings, ExecutionSnapshot, ExecutionTracker, Language,
    RunOptions, YepCodeEnv, YepCodeRun,
};

const INITIATED_BY: &str = "yepcode-cli";

#[derive(Parser)]
#[command(name = "yepcode")]
#[command(about = "YepCode Run CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    credentials: CredentialArgs,
}

/// Overrides for the YEPCODE_* environment
#[derive(Args)]
struct CredentialArgs {
    /// API host (default: https://cloud.yepcode.io)
    #[arg(long, global = true)]
    api_host: Option<String>,

    /// API token (sk-...)
    #[arg(long, global = true)]
    api_token: Option<String>,

    /// Team id, when it cannot be derived from the credentials
    #[arg(long, global = true)]
    team_id: Option<String>,

    /// HTTP request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

impl CredentialArgs {
    fn to_config(&self) -> ApiConfig {
        ApiConfig {
            api_host: self.api_host.clone(),
            api_token: self.api_token.clone(),
            team_id: self.team_id.clone(),
            timeout_ms: self.timeout_ms,
            ..ApiConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a snippet and stream its logs until it ends
    Run {
        /// Source file, or "-" for stdin
        file: PathBuf,

        /// javascript or python (detected when omitted)
        #[arg(short, long)]
        language: Option<Language>,

        /// Parameters as a JSON object
        #[arg(short, long)]
        parameters: Option<String>,

        /// Delete the remote process once the execution ends
        #[arg(long, conflicts_with = "no_wait")]
        remove_on_done: bool,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        comment: Option<String>,

        /// Agent pool to run on
        #[arg(long)]
        agent_pool: Option<String>,

        /// Remote execution timeout in milliseconds
        #[arg(long)]
        execution_timeout: Option<u64>,

        /// Print the execution id and return without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Follow an existing execution
    Watch {
        execution_id: String,
    },

    /// Kill a running execution
    Kill {
        execution_id: String,
    },

    /// Run an execution again with the same parameters
    Rerun {
        execution_id: String,

        /// Follow the new execution until it ends
        #[arg(long)]
        watch: bool,
    },

    /// Guess the language of a snippet (no credentials needed)
    Detect {
        /// Source file, or "-" for stdin
        file: PathBuf,
    },

    /// Manage team variables
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
}

#[derive(Subcommand)]
enum EnvCommands {
    /// List team variables
    List,

    /// Create or update a variable
    Set {
        key: String,
        value: String,

        /// Store the variable as non-sensitive (only on creation)
        #[arg(long)]
        public: bool,
    },

    /// Delete a variable
    Del {
        key: String,
    },
}

#[derive(Tabled)]
struct EnvRow {
    key: String,
    value: String,
}

#[derive(Tabled)]
struct ScoreRow {
    language: &'static str,
    score: u32,
}

fn init_logging() {
    let log_format = std::env::var("YEPCODE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("yepcode=info"));

    // Logs go to stderr; stdout carries command output
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn read_source(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("Failed to read code from stdin")?;
        return Ok(code);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn parse_parameters(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw).context("Invalid JSON parameters")?;
    if !value.is_object() {
        anyhow::bail!("Parameters must be a JSON object");
    }
    Ok(Some(value))
}

fn printing_events() -> ExecutionEvents {
    ExecutionEvents::new()
        .on_log(|log| {
            let level = if log.is_error() {
                log.level.red()
            } else {
                log.level.dimmed()
            };
            println!("{} {} {}", log.timestamp.dimmed(), level, log.message);
        })
        .on_finish(|_| {})
        .on_error(|_| {})
}

/// Wait for the execution and print its outcome; Err when it failed
async fn follow(execution: ExecutionTracker) -> Result<()> {
    println!(
        "{}",
        format!("▶ Execution {}", execution.execution_id()).cyan().bold()
    );

    let done = execution
        .wait_for_done()
        .await
        .context("Failed while waiting for the execution")?;
    print_outcome(&done)
}

fn print_outcome(done: &ExecutionSnapshot) -> Result<()> {
    let status = done
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    println!();

    match done.status {
        Some(s) if s.is_failure() => {
            println!("{} {}", "✗".red(), status.red().bold());
            if let Some(error) = &done.error {
                println!("  {} {}", "Error:".bold(), error);
            }
            anyhow::bail!("Execution {} ended with {}", done.execution_id, status)
        }
        _ => {
            println!("{} {}", "✓".green(), status.green().bold());
            if let Some(value) = &done.return_value {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.credentials.to_config();

    match cli.command {
        Commands::Run {
            file,
            language,
            parameters,
            remove_on_done,
            tag,
            comment,
            agent_pool,
            execution_timeout,
            no_wait,
        } => {
            let code = read_source(&file)?;
            let options = RunOptions {
                language,
                remove_on_done,
                parameters: parse_parameters(parameters.as_deref())?,
                initiated_by: Some(INITIATED_BY.to_string()),
                tag,
                comment,
                settings: ExecutionSettings {
                    agent_pool_slug: agent_pool,
                    callback_url: None,
                    timeout: execution_timeout,
                },
                events: Some(printing_events()),
                ..RunOptions::default()
            };

            let runner = YepCodeRun::new(config).context("Invalid configuration")?;
            let execution = runner.run(&code, options).await?;

            if no_wait {
                println!("{}", execution.execution_id());
                return Ok(());
            }
            follow(execution).await?;
        }

        Commands::Watch { execution_id } => {
            let runner = YepCodeRun::new(config).context("Invalid configuration")?;
            let execution = runner
                .get_execution(&execution_id, Some(printing_events()))
                .await?;
            follow(execution).await?;
        }

        Commands::Kill { execution_id } => {
            let runner = YepCodeRun::new(config).context("Invalid configuration")?;
            let execution = runner.get_execution(&execution_id, None).await?;
            execution.kill().await?;

            println!(
                "{}",
                format!("✓ Execution {} killed", execution_id).green().bold()
            );
        }

        Commands::Rerun {
            execution_id,
            watch,
        } => {
            let runner = YepCodeRun::new(config).context("Invalid configuration")?;
            let events = watch.then(printing_events);
            let original = runner.get_execution(&execution_id, events).await?;
            let rerun = original.rerun().await?;

            if watch {
                follow(rerun).await?;
            } else {
                println!(
                    "{}",
                    format!("✓ Rerun started: {}", rerun.execution_id())
                        .green()
                        .bold()
                );
            }
        }

        Commands::Detect { file } => {
            let code = read_source(&file)?;
            let scores = score(&code);

            let rows = vec![
                ScoreRow {
                    language: Language::JavaScript.as_str(),
                    score: scores.javascript,
                },
                ScoreRow {
                    language: Language::Python.as_str(),
                    score: scores.python,
                },
            ];
            println!("{}", Table::new(rows));

            match scores.verdict() {
                Some(language) => println!("{} {}", "Detected:".bold(), language.to_string().green()),
                None => println!("{}", "Unable to detect the language".yellow()),
            }
        }

        Commands::Env { command } => {
            let env = YepCodeEnv::new(config).context("Invalid configuration")?;

            match command {
                EnvCommands::List => {
                    let rows: Vec<EnvRow> = env
                        .env_vars()
                        .await?
                        .into_iter()
                        .map(|v| EnvRow {
                            key: v.key,
                            value: v.value.unwrap_or_else(|| "********".to_string()),
                        })
                        .collect();

                    if rows.is_empty() {
                        println!("{}", "No team variables".yellow());
                    } else {
                        println!("{}", Table::new(rows));
                    }
                }
                EnvCommands::Set { key, value, public } => {
                    env.set_env_var(&key, &value, !public).await?;
                    println!("{}", format!("✓ {} set", key).green().bold());
                }
                EnvCommands::Del { key } => {
                    if env.del_env_var(&key).await? {
                        println!("{}", format!("✓ {} deleted", key).green().bold());
                    } else {
                        println!("{}", format!("{} not found", key).yellow());
                    }
                }
            }
        }
    }

    Ok(())
}
