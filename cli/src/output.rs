use batchchat_core::{AssistantTurn, Conversation, Slot, SlotStatus, TurnBody, UserTurn};
use colored::*;

use crate::intake::SelectedImage;
use crate::suggestions::Suggestions;

pub const LOADING: &str = "Loading...";
pub const UNAVAILABLE: &str = "unavailable";

/// Text shown for one answer slot
pub fn slot_display(slot: &Slot) -> &str {
    if !slot.text().is_empty() {
        return slot.text();
    }
    match slot.status() {
        SlotStatus::Pending | SlotStatus::Streaming => LOADING,
        SlotStatus::Complete | SlotStatus::Failed { .. } => UNAVAILABLE,
    }
}

/// Renders one answer block per image
pub fn render_assistant_turn(turn: &AssistantTurn, labels: &[String]) -> String {
    let mut output = String::new();
    for (index, slot) in turn.slots().iter().enumerate() {
        let label = labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Image {}", index + 1));
        let heading = format!("[{}] {}", index + 1, label);
        output.push_str(&format!("{}\n", heading.blue().bold()));

        let body = slot_display(slot);
        if slot.is_failed() && !slot.text().is_empty() {
            output.push_str(&format!("{} {}\n", body, "(incomplete)".dimmed()));
        } else if slot.text().is_empty() {
            output.push_str(&format!("{}\n", body.dimmed()));
        } else {
            output.push_str(&format!("{}\n", body));
        }
        output.push('\n');
    }
    output
}

/// Renders the whole conversation, oldest turn first
pub fn render_transcript(conversation: &Conversation, labels: &[String]) -> String {
    let mut output = String::new();
    for turn in conversation.turns() {
        match &turn.body {
            TurnBody::User(UserTurn::Images(images)) => {
                output.push_str(&format!(
                    "{} {} image(s)\n\n",
                    "Uploaded".green().bold(),
                    images.len()
                ));
            }
            TurnBody::User(UserTurn::Question(question)) => {
                output.push_str(&format!(
                    "{} {}: {}\n\n",
                    turn.created_at.format("%H:%M:%S").to_string().dimmed(),
                    "You".green().bold(),
                    question
                ));
            }
            TurnBody::Assistant(assistant) => {
                output.push_str(&render_assistant_turn(assistant, labels));
            }
        }
    }
    output
}

pub fn print_assistant_turn(turn: &AssistantTurn, labels: &[String]) {
    print!("{}", render_assistant_turn(turn, labels));
}

pub fn print_selected_images(images: &[SelectedImage]) {
    println!("{}", "Selected images:".yellow().bold());
    for (index, image) in images.iter().enumerate() {
        println!(
            "  [{}] {} ({:.1} KB, {})",
            index + 1,
            image.name,
            image.data.bytes.len() as f64 / 1024.0,
            image.data.mime_type.as_deref().unwrap_or("unknown type")
        );
    }
    println!();
}

pub fn print_suggestions(suggestions: &Suggestions) {
    if suggestions.is_empty() {
        println!("{}", "No suggestions left.".dimmed());
        return;
    }
    println!("{}", "Suggestions:".cyan());
    for (index, suggestion) in suggestions.list().iter().enumerate() {
        println!("  /s {}  {}", index + 1, suggestion);
    }
}

pub fn print_usage_instructions() {
    println!("{}", "Ask a question about the images.".yellow().bold());
    println!("  {}  list suggested questions", "/s".green().bold());
    println!("  {}  ask suggestion N", "/s N".green().bold());
    println!("  {}  show the transcript", "/t".green().bold());
    println!("  {}  leave the chat", "exit".green().bold());
    println!();
}
