use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;

use bookd::cli::{self, BookArgs, ConfigUpdate, OutputFormat, Target};
use bookd::models::{CustomerDetails, LocalConfig};

#[derive(Parser)]
#[command(name = "bookd")]
#[command(about = "Appointment booking against a bookings proxy", version)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Booking proxy URL (default: http://localhost:8787)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Business slug
    #[arg(long, global = true)]
    business: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable services
    Services,
    /// Show the slots for a day
    Slots {
        /// Day to show (e.g., "2026-02-03")
        #[arg(long)]
        date: String,
        /// Service display name
        #[arg(long)]
        service: Option<String>,
    },
    /// Find the nearest day with an open slot
    Nearest {
        /// Service display name
        #[arg(long)]
        service: Option<String>,
    },
    /// Book an appointment
    Book {
        /// Day of the appointment (e.g., "2026-02-03")
        #[arg(long)]
        date: String,
        /// Slot time as listed (e.g., "10:30 AM")
        #[arg(long)]
        time: String,
        /// Service display name
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        notes: Option<String>,
        /// Answer a custom question, as QUESTION=VALUE (repeatable)
        #[arg(long = "answer", value_parser = cli::parse_answer_arg)]
        answers: Vec<(String, String)>,
        /// Retry failed submissions without asking
        #[arg(long)]
        yes: bool,
    },
    /// List the custom questions a service asks
    Questions {
        /// Service display name
        #[arg(long)]
        service: Option<String>,
    },
    /// Show the detected time zone
    Tz {
        /// Business zone to compare against (e.g., "Eastern Standard Time")
        #[arg(long)]
        business_zone: Option<String>,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the booking proxy URL
    ApiUrl { url: String },
    /// Set the default business slug
    Business { slug: String },
    /// Set the default service (leave empty to use the first listed)
    Service { name: Option<String> },
    /// Set the clock used for lead time and "today": customer or business
    Clock { source: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("bookd=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let target = |service: Option<String>| Target {
        api_url: cli.api_url.clone(),
        business: cli.business.clone(),
        service,
    };

    match cli.command {
        Commands::Services => {
            cli::run_services(&target(None), format).await?;
        }
        Commands::Slots { ref date, ref service } => {
            cli::run_slots(&target(service.clone()), date, format).await?;
        }
        Commands::Nearest { ref service } => {
            cli::run_nearest(&target(service.clone()), format).await?;
        }
        Commands::Book {
            ref date,
            ref time,
            ref service,
            ref name,
            ref email,
            ref phone,
            ref notes,
            ref answers,
            yes,
        } => {
            let args = BookArgs {
                date: date.clone(),
                time: time.clone(),
                customer: CustomerDetails {
                    name: name.clone(),
                    email: email.clone(),
                    phone: phone.clone(),
                    notes: notes.clone(),
                    answers: Vec::new(),
                },
                answers: answers.clone(),
                assume_yes: yes,
            };
            cli::run_book(&target(service.clone()), &args, format).await?;
        }
        Commands::Questions { ref service } => {
            cli::run_questions(&target(service.clone()), format).await?;
        }
        Commands::Tz { ref business_zone } => {
            cli::run_tz(business_zone.as_deref(), format)?;
        }
        Commands::Config { ref action } => match action {
            ConfigAction::Show => {
                cli::run_config_show(cli.api_url.as_deref(), format)?;
            }
            ConfigAction::ApiUrl { url } => {
                cli::run_config_set(ConfigUpdate::ApiUrl(url.clone()), format)?;
            }
            ConfigAction::Business { slug } => {
                cli::run_config_set(ConfigUpdate::Business(slug.clone()), format)?;
            }
            ConfigAction::Service { name } => {
                cli::run_config_set(ConfigUpdate::Service(name.clone()), format)?;
            }
            ConfigAction::Clock { source } => {
                cli::run_config_set(ConfigUpdate::Clock(source.clone()), format)?;
            }
        },
        Commands::Serve { port } => {
            let config = LocalConfig::load().unwrap_or_default();
            let api_url = config.resolve_api_url(cli.api_url.as_deref())?;
            let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
            bookd::server::run_server(addr, &api_url, config.clock).await?;
        }
    }

    Ok(())
}
