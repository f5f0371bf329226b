//! Docsumma CLI - extractive document summarisation
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use dialoguer::{Input, Password};
use docsumma::controller::ControllerError;
use docsumma::extract::MediaType;
use docsumma::{Config, Controller, SummaryLength, SummaryResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docsumma")]
#[command(author, version, about = "Extractive document summarisation", long_about = None)]
struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise text, a file, or stdin
    Summarise {
        /// Text to summarise (read from stdin when omitted)
        text: Option<String>,
        /// Summarise a PDF, DOCX, ODT or text file instead
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Declared media type of the file, inferred from its extension otherwise
        #[arg(long, requires = "file")]
        mime: Option<String>,
        /// Summary length: short (3), medium (5) or long (8 sentences)
        #[arg(short, long)]
        length: Option<SummaryLength>,
        /// Document language code
        #[arg(long)]
        language: Option<String>,
        /// Print the sentences as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the service endpoint and API key
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
    /// List supported file formats
    Formats,
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CredentialsAction {
    /// Save an endpoint and API key
    Set {
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        key: Option<String>,
    },
    /// Show the saved endpoint and a masked key
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Summarise {
            text,
            file,
            mime,
            length,
            language,
            json,
        } => {
            let mut config = Config::load()?;
            if let Some(language) = language {
                config.service.language = language;
            }
            let length = length.unwrap_or(config.service.default_length);
            let controller = Controller::from_config(config)?;

            let outcome = match file {
                Some(path) => controller
                    .summarize_file(&path, mime.as_deref(), length)
                    .await
                    .map(|summary| {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        eprintln!(
                            "{} {} ({}, {:.2} MB)",
                            "File:".dimmed(),
                            name,
                            summary.file.media_type.label(),
                            summary.file.size_mb()
                        );
                        eprintln!(
                            "{} {} characters",
                            "Extracted".dimmed(),
                            summary.characters
                        );
                        summary.summary
                    }),
                None => {
                    let text = match text {
                        Some(text) => text,
                        None => read_stdin()?,
                    };
                    controller.summarize_text(&text, length).await
                }
            };

            match outcome {
                Ok(summary) => print_summary(&summary, length, json)?,
                Err(e) => report(e),
            }
        }
        Commands::Credentials { action } => {
            let controller = Controller::from_config(Config::load()?)?;
            match action {
                CredentialsAction::Set { endpoint, key } => {
                    let endpoint = match endpoint {
                        Some(endpoint) => endpoint,
                        None => Input::<String>::new()
                            .with_prompt("Endpoint")
                            .interact_text()?,
                    };
                    let key = match key {
                        Some(key) => key,
                        None => Password::new().with_prompt("API key").interact()?,
                    };

                    match controller.save_credentials(&endpoint, &key) {
                        Ok(saved) => println!(
                            "{} credentials for {}",
                            "Saved".green().bold(),
                            saved.endpoint
                        ),
                        Err(e) => report(e),
                    }
                }
                CredentialsAction::Show => match controller.stored_credentials()? {
                    Some(creds) => {
                        println!("Endpoint: {}", creds.endpoint);
                        println!("API key:  {}", creds.masked_key());
                    }
                    None => println!("No credentials saved."),
                },
            }
        }
        Commands::Formats => {
            println!("Supported formats (max 10 MB):\n");
            for media_type in MediaType::ALL {
                println!("  {:<5} {}", media_type.label(), media_type.mime());
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "docsumma", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,docsumma=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_stdin() -> anyhow::Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        println!("Paste the text to summarise, then press Ctrl-D:");
    }
    let mut text = String::new();
    stdin.lock().read_to_string(&mut text)?;
    Ok(text)
}

fn print_summary(summary: &SummaryResult, length: SummaryLength, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "\n{} ({}, {} sentences)\n",
        "Summary".bold(),
        length,
        summary.sentences.len()
    );
    println!("{}", summary.text());
    Ok(())
}

/// Print the user-facing message for a failed request and exit
fn report(e: ControllerError) -> ! {
    tracing::debug!(error = ?e, "request failed");
    eprintln!("{} {}", "Error:".red().bold(), e.user_message());
    std::process::exit(1)
}
