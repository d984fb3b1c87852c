//! dtecflex-transfer - operator entry point for the transfer-and-publish pipeline

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::error;

use dtecflex::config::{apply_env_overrides, expand_home};
use dtecflex::db::{aux_repo, record_repo};
use dtecflex::logging::{self, LogOptions};
use dtecflex::{load_config, Config, Database, DtecError, JobState, TransferService};

#[derive(Parser, Debug)]
#[command(name = "dtecflex-transfer", version, about = "Transfer approved news media and publish their entities")]
struct Cli {
    /// Path to the JSON config file. Defaults apply when omitted.
    #[arg(short, long, global = true, env = "DTECFLEX_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directives (overridden by RUST_LOG).
    #[arg(long, global = true)]
    log: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer and publish the approved records of a day.
    Run {
        /// Day to process as YYYYMMDD. Defaults to today.
        #[arg(short, long)]
        date: Option<String>,

        /// Category name or abbreviation. All categories when omitted.
        #[arg(short = 'k', long)]
        category: Option<String>,

        /// Print every event as a JSON line.
        #[arg(long)]
        json: bool,
    },

    /// Move records into the approved state.
    Approve {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show the lifecycle state of records.
    Status {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

fn main() {
    let cli = Cli::parse();

    logging::init(&LogOptions {
        filter: cli.log.clone(),
        json: cli.log_json,
    });

    match execute(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<(Config, Database), DtecError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = Config::with_defaults();
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            config
        }
    };
    let db = Database::open(&expand_home(&config.database_path))?;
    Ok((config, db))
}

/// Returns whether the command succeeded.
fn execute(cli: &Cli) -> Result<bool, DtecError> {
    let (config, db) = load(cli)?;

    match &cli.command {
        Command::Run {
            date,
            category,
            json,
        } => {
            let service = TransferService::new(&config, db)?;
            let ok = follow_run(&service, date.as_deref(), category.as_deref(), *json)?;
            service.shutdown();
            Ok(ok)
        }
        Command::Approve { ids } => {
            let report = record_repo::approve_many(&db, ids)?;
            println!("Approved {} record(s)", report.updated);
            if !report.not_found.is_empty() {
                println!("Not found: {:?}", report.not_found);
            }
            Ok(report.not_found.is_empty())
        }
        Command::Status { ids } => {
            let mut all_found = true;
            for &id in ids {
                match record_repo::find_by_id(&db, id)? {
                    Some(record) => {
                        let registration = record.registration.as_deref().unwrap_or("-");
                        let rows = match record.registration.as_deref() {
                            Some(reg) => aux_repo::count_for_registration(&db, reg)?,
                            None => 0,
                        };
                        println!(
                            "{:>8}  {:<14}  {:<16}  {} index row(s)",
                            id,
                            registration,
                            record.status.as_str(),
                            rows
                        );
                    }
                    None => {
                        all_found = false;
                        println!("{:>8}  not found", id);
                    }
                }
            }
            Ok(all_found)
        }
    }
}

fn follow_run(
    service: &TransferService,
    date: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<bool, DtecError> {
    let mut feed = service.subscribe(date, category)?;
    let response = service.trigger(date, category)?;
    if !json {
        println!(
            "Job {} scheduled for {} ({})",
            response.job_id,
            response.date,
            response.category.as_deref().unwrap_or("all categories")
        );
    }

    loop {
        match feed.next_timeout(Duration::from_millis(500)) {
            Some(message) => {
                let event: Value = serde_json::from_str(&message).unwrap_or(Value::Null);
                if json {
                    println!("{}", message);
                } else {
                    print_event(&event);
                }
                if matches!(event["event"].as_str(), Some("DONE") | Some("FAILED")) {
                    break;
                }
            }
            None => {
                // Runs rejected by the lock never publish, so poll the job too.
                if service.jobs().get(&response.job_id).is_some_and(|j| j.status.is_finished()) {
                    break;
                }
            }
        }
    }

    service.wait_idle();
    let status = service.status(&response.job_id);
    if let Some(err) = &status.error {
        eprintln!("Run failed: {}", err);
    }
    Ok(status.status == JobState::Success)
}

fn print_event(event: &Value) {
    let kind = event["event"].as_str().unwrap_or("?");
    let progress = event["progress"].as_u64().unwrap_or(0);
    match kind {
        "PROGRESS" => {
            let step = event["step"].as_u64().unwrap_or(0);
            let total = event["total"].as_u64().unwrap_or(0);
            let state = event["state"].as_str().unwrap_or("");
            let detail = event["last"].as_str().or(event["error"].as_str()).unwrap_or("");
            println!("[{:>3}%] {}/{} {} {}", progress, step, total, state, detail);
        }
        "DONE" => {
            let result = &event["result"];
            println!(
                "[100%] done: {} moved, {} failed of {}",
                result["moved"], result["failed"], result["total"]
            );
        }
        "FAILED" => println!("[{:>3}%] failed: {}", progress, event["error"].as_str().unwrap_or("")),
        other => println!("[{:>3}%] {}", progress, other),
    }
}
