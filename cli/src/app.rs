use anyhow::{Context, Result};
use batchchat_core::{ChatResult, ChatSession, CompletionService, TranscriptObserver, TurnId};
use colored::*;
use std::io::{self, Write};
use tracing::{debug, error, info};

use crate::interrupt::Interrupts;
use crate::logging::{notify_error, notify_info};
use crate::output::{
    print_assistant_turn, print_suggestions, print_usage_instructions, render_transcript,
};
use crate::progress::StreamProgress;
use crate::suggestions::Suggestions;

pub const ASSISTANT_ERROR: &str =
    "An error occurred while requesting the assistant. Please try again.";

/// What happened to one submitted question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    Blank,
    Answered,
    Failed,
}

/// Runs one question through the session; Ctrl-C cancels the in-flight requests.
async fn dispatch_question<S: CompletionService>(
    session: &mut ChatSession<S>,
    question: &str,
    observer: &dyn TranscriptObserver,
    interrupts: &Interrupts,
) -> ChatResult<Option<TurnId>> {
    let dispatch = interrupts.begin_dispatch();
    session.ask(question, observer, dispatch.token()).await
}

/// Asks one question, shows the answers streaming in and then prints them.
///
/// Failures are reported to the user and leave the transcript as it is.
pub async fn ask_and_render<S: CompletionService>(
    session: &mut ChatSession<S>,
    labels: &[String],
    question: &str,
    interrupts: &Interrupts,
) -> AskOutcome {
    debug!(question = question, "Submitting question");
    let progress = StreamProgress::new(labels);
    let result = dispatch_question(session, question, &progress, interrupts).await;
    progress.clear();

    let outcome = match result {
        Ok(None) => return AskOutcome::Blank,
        Ok(Some(turn)) => {
            info!(turn = %turn, "All answers received");
            AskOutcome::Answered
        }
        Err(e) => {
            error!(error = %e, "Error requesting assistant");
            AskOutcome::Failed
        }
    };

    if let Some(turn) = session.conversation().and_then(|c| c.last_assistant_turn()) {
        print_assistant_turn(turn, labels);
    }
    if outcome == AskOutcome::Failed {
        notify_error(ASSISTANT_ERROR);
    }
    outcome
}

/// Asks each question in order, then returns
pub async fn run_questions<S: CompletionService>(
    session: &mut ChatSession<S>,
    labels: &[String],
    questions: &[String],
    interrupts: &Interrupts,
) -> Result<()> {
    let mut failures = 0;
    for question in questions {
        println!("{}: {}", "You".green().bold(), question);
        if ask_and_render(session, labels, question, interrupts).await == AskOutcome::Failed {
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} questions failed", failures, questions.len());
    }
    Ok(())
}

/// Runs an interactive chat session over the selected images
pub async fn run_interactive_chat<S: CompletionService>(
    session: &mut ChatSession<S>,
    labels: &[String],
    interrupts: &Interrupts,
) -> Result<()> {
    let mut suggestions = Suggestions::default();
    print_usage_instructions();
    print_suggestions(&suggestions);
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Exiting chat session.");
            break;
        }

        let question = match parse_command(input) {
            Command::Ask(question) => {
                suggestions.mark_used(&question);
                question
            }
            Command::ListSuggestions => {
                print_suggestions(&suggestions);
                continue;
            }
            Command::Suggestion(number) => match suggestions.take(number) {
                Some(question) => {
                    println!("{}: {}", "You".green().bold(), question);
                    question
                }
                None => {
                    notify_info(&format!("There is no suggestion {}.", number));
                    continue;
                }
            },
            Command::Transcript => {
                if let Some(conversation) = session.conversation() {
                    print!("{}", render_transcript(conversation, labels));
                }
                continue;
            }
        };

        ask_and_render(session, labels, &question, interrupts).await;
        println!();
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ask(String),
    ListSuggestions,
    Suggestion(usize),
    Transcript,
}

fn parse_command(input: &str) -> Command {
    match input {
        "/s" => Command::ListSuggestions,
        "/t" => Command::Transcript,
        _ => match input.strip_prefix("/s ").map(|n| n.trim().parse::<usize>()) {
            Some(Ok(number)) => Command::Suggestion(number),
            _ => Command::Ask(input.to_string()),
        },
    }
}
