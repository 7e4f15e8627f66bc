//! CardioLake CLI — the main entry point.
//!
//! Commands:
//! - `init`          — Write a starter config and agent directory
//! - `status`        — Show the effective configuration
//! - `doctor`        — Check credentials, datastore and agents
//! - `serve`         — Start the HTTP API
//! - `patients`      — List patients
//! - `summary`       — One patient's flattened summary
//! - `observations`  — One patient's numeric measurements
//! - `verify`        — Show what the datastore holds for a patient
//! - `seed`          — Load synthetic datasets
//! - `report`        — Run the specialists and ask follow-up questions
//! - `questions`     — List the quick questions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod render;

use commands::seed::Dataset;

#[derive(Parser)]
#[command(
    name = "cardiolake",
    about = "CardioLake — FHIR patient data and specialist agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config and agent directory
    Init,

    /// Show the effective configuration
    Status,

    /// Check credentials, datastore and agents
    Doctor,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve synthetic data from memory instead of the datastore
        #[arg(long)]
        demo: bool,
    },

    /// List patients
    Patients {
        /// Maximum number of patients
        #[arg(short, long)]
        count: Option<u32>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one patient's flattened summary
    Summary {
        patient_id: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one patient's numeric measurements
    Observations {
        patient_id: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what the datastore holds for a patient
    Verify { patient_id: String },

    /// Load synthetic datasets into the datastore
    Seed {
        #[command(subcommand)]
        dataset: SeedCommand,
    },

    /// Run the specialists for a patient and ask follow-up questions
    Report {
        patient_id: String,

        /// Ask a question once the reports are ready (repeatable)
        #[arg(short, long = "ask")]
        ask: Vec<String>,

        /// Keep asking questions from stdin
        #[arg(short, long)]
        interactive: bool,
    },

    /// List the quick questions
    Questions,
}

#[derive(Subcommand)]
enum SeedCommand {
    /// Five cardiac patients with ECG observations and reports
    Cardiac,

    /// The reference ECG patient
    Ecg,

    /// Five MRI patients with imaging reports
    Mri,

    /// Attach an image to an existing patient
    Media {
        patient_id: String,

        /// Image file to embed
        #[arg(long)]
        image: PathBuf,

        #[arg(long, default_value = "image/png")]
        content_type: String,

        /// Media title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,

        /// Patient display name for the subject reference
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Serve { port, demo } => commands::serve::run(port, demo).await?,
        Commands::Patients { count, json } => commands::patients::list(count, json).await?,
        Commands::Summary { patient_id, json } => {
            commands::patients::summary(&patient_id, json).await?
        }
        Commands::Observations { patient_id, json } => {
            commands::patients::observations(&patient_id, json).await?
        }
        Commands::Verify { patient_id } => commands::patients::verify(&patient_id).await?,
        Commands::Seed { dataset } => {
            let dataset = match &dataset {
                SeedCommand::Cardiac => Dataset::Cardiac,
                SeedCommand::Ecg => Dataset::Ecg,
                SeedCommand::Mri => Dataset::Mri,
                SeedCommand::Media {
                    patient_id,
                    image,
                    content_type,
                    title,
                    name,
                } => Dataset::Media {
                    patient_id,
                    patient_name: name.as_deref(),
                    image,
                    content_type,
                    title: title.as_deref(),
                },
            };
            commands::seed::run(dataset).await?
        }
        Commands::Report {
            patient_id,
            ask,
            interactive,
        } => commands::report::run(&patient_id, ask, interactive).await?,
        Commands::Questions => commands::report::list_questions().await?,
    }

    Ok(())
}
