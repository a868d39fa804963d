use anyhow::{Context, Result};
use batchchat_core::{ChatSession, FanoutOrchestrator};
use clap::Parser;
use colored::*;
use tracing::{error, info};

mod app;
mod cli;
mod config;
mod intake;
mod interrupt;
mod logging;
mod output;
mod progress;
mod suggestions;

use crate::cli::Args;
use crate::interrupt::Interrupts;
use crate::logging::init_tracing;
use crate::output::print_selected_images;

/// Main function - Loads the images, then asks every question about all of them
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the config reads them
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = config::resolve(&args)?;
    init_tracing(args.verbose, config.log_level.as_deref());

    if args.save_config {
        let path = config::save(&args, &config)?;
        info!(path = %path.display(), "Config saved");
    }

    let images = intake::load_images(&args.images)?;
    print_selected_images(&images);

    let orchestrator = FanoutOrchestrator::from_config(&config)
        .context("Failed to set up the completion client")?;
    let mut session = ChatSession::new(orchestrator);
    info!(session = %session.id, endpoint = config.endpoint(), "Session created");

    let labels: Vec<String> = images.iter().map(|image| image.name.clone()).collect();
    session.start(images.into_iter().map(|image| image.data).collect())?;

    // One Ctrl-C handler for the whole run: it cancels a running question, or exits
    let interrupts = Interrupts::default();
    interrupts.install()?;

    if !args.questions.is_empty() {
        if let Err(e) = app::run_questions(&mut session, &labels, &args.questions, &interrupts).await {
            error!(error = %e, "Batch questions failed");
            if !args.wants_interactive() {
                return Err(e);
            }
        }
    }

    if args.wants_interactive() {
        if let Err(e) = app::run_interactive_chat(&mut session, &labels, &interrupts).await {
            error!(error = %e, "Error in interactive chat");
            eprintln!("{}", format!("Interactive chat failed: {}", e).red());
            return Err(e);
        }
    }

    Ok(())
}
