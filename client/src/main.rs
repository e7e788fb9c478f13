//! A simple CLI for submitting predictions and viewing the leaderboard.

#![warn(clippy::all, clippy::pedantic)]

extern crate podium_common;
use podium_common::client_api::{
    get_answer_key_info_from_server, get_leaderboard_from_server, get_participants_from_server,
    submit_predictions_to_server,
};
use podium_common::validation::{PredictionTable, ValidationError, check_column_count};
use podium_common::{AnswerKeyInfo, LeaderboardResponse, Participant, SubmitReceipt};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// The base API URL to connect to
    #[arg(long, default_value = "http://localhost:8000", env = "PODIUM_API_BASE")]
    api_base: String,

    /// How many times to try reading from the server before giving up
    #[arg(long, default_value_t = 3, env = "PODIUM_MAX_RETRIES")]
    max_retries: u32,

    /// Show additional output
    #[arg(short, long, env = "PODIUM_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a CSV of predictions and print the resulting score
    Submit {
        /// The CSV file: a header line, then one prediction per row
        file: PathBuf,

        /// Your name or team name
        #[arg(short, long, env = "PODIUM_NAME")]
        name: String,

        /// A short description of the model that produced the file
        #[arg(short, long, env = "PODIUM_MODEL")]
        model: String,

        /// Skip the local shape check and let the server decide
        #[arg(long)]
        skip_check: bool,
    },
    /// Print the submission history and the ranking
    Leaderboard {
        /// Print the raw JSON response instead of tables
        #[arg(long)]
        json: bool,
    },
    /// List everyone who has submitted
    Participants,
}

/// Catch the obvious shape mistakes before spending an upload on them.
fn precheck(csv: &[u8], info: AnswerKeyInfo) -> Result<(), ValidationError> {
    let table = PredictionTable::from_csv_bytes(csv)?;
    if table.row_count() != info.rows {
        return Err(ValidationError::RowCountMismatch {
            found: table.row_count(),
            expected: info.rows,
        });
    }
    check_column_count(&table)
}

fn print_receipt(receipt: &SubmitReceipt) {
    println!(
        "Submission #{} accepted. F1 score: {}",
        receipt.submission_id, receipt.score_display
    );
    if let Some(warning) = &receipt.warning {
        warn!("{warning}");
        debug!("Ignored rows: {:?}", receipt.dropped_rows);
    }
}

fn print_leaderboard(board: &LeaderboardResponse) {
    if board.history.is_empty() {
        println!("No submissions yet. Be the first!");
        return;
    }

    println!("Submission history");
    println!(
        "{:<18} {:<24} {:<32} {:>8}",
        "Sent", "Name", "Model", "F1"
    );
    for row in &board.history {
        println!(
            "{:<18} {:<24} {:<32} {:>8}",
            row.submitted_at_display, row.name, row.model_description, row.score_display
        );
    }

    println!();
    println!("Ranking");
    println!("{:<8} {:<24} {:>8}", "Position", "Name", "F1");
    for row in &board.ranking {
        println!(
            "{:<8} {:<24} {:>8}",
            row.position_display, row.name, row.score_display
        );
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Submit {
            file,
            name,
            model,
            skip_check,
        } => {
            // fail fast on the same rules the server applies
            let participant = Participant::new(name, model)?;
            let csv = std::fs::read(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            if !skip_check {
                let info = get_answer_key_info_from_server(&cli.api_base, cli.max_retries)?;
                debug!("Server expects {} rows", info.rows);
                if let Err(e) = precheck(&csv, info) {
                    bail!("{} was not submitted: {e}", file.display());
                }
            }

            let file_name = file
                .file_name()
                .map_or_else(|| "predictions.csv".to_string(), |n| n.to_string_lossy().into_owned());
            info!("Submitting {file_name} as {}", participant.name());
            let receipt = submit_predictions_to_server(
                &cli.api_base,
                participant.name(),
                participant.model_description(),
                &file_name,
                csv,
            )?;
            print_receipt(&receipt);
        }
        Command::Leaderboard { json } => {
            let board = get_leaderboard_from_server(&cli.api_base, cli.max_retries)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                print_leaderboard(&board);
            }
        }
        Command::Participants => {
            for name in get_participants_from_server(&cli.api_base, cli.max_retries)? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    run(&cli)
}
