//! Network Status Checker - Main CLI Application
//!
//! Streams IP, reachability, region and speed checks to the terminal as
//! each one finishes.

use clap::Parser;
use network_status_checker::{
    app::{exit_code, App},
    cli::{Cli, supports_color},
    config::{load_config, EnvManager},
    error::{AppError, Result},
};
use std::{error::Error, process};

#[tokio::main]
async fn main() {
    // Probe panics are caught by the orchestrator, so the hook must not exit
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("error: {}", message);
        process::exit(2);
    }

    if cli.should_show_topic_help() {
        println!("{}", cli.display_help());
        return;
    }

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            let use_color = supports_color();
            eprintln!("{}", e.format_for_console(use_color));

            if let Some(source) = e.source() {
                eprintln!("Caused by: {}", source);
            }

            print_error_suggestions(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic; returns the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    if let Some(path) = &cli.write_env_example {
        EnvManager::save_example_env_file(path)?;
        println!("Example configuration written to {}", path.display());
        return Ok(0);
    }

    if cli.debug {
        for warning in EnvManager::validate_current_env() {
            eprintln!("{}", warning);
        }
    }

    let config = load_config(cli)?;
    let outcome = App::new(config).run().await?;
    Ok(exit_code(outcome.status))
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (nsc --write-env-example .env.example)");
            eprintln!("  - Endpoint URLs must start with http:// or https://");
            eprintln!("  - Country codes are two letters, e.g. KP,IR");
            eprintln!("  - See nsc --help-topic env for every variable");
        }
        AppError::Orchestration(_) => {
            eprintln!();
            eprintln!("The scheduler stopped on an internal error; rerun with --debug and report the log.");
        }
        _ => {}
    }
}
