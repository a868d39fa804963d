use batchchat_core::{Slot, SlotHandle, SlotStatus, TranscriptObserver};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

const PREVIEW_CHARS: usize = 60;

/// One spinner per image showing the tail of its answer while it streams
pub struct StreamProgress {
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl StreamProgress {
    pub fn new(labels: &[String]) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bars = labels
            .iter()
            .map(|label| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style.clone());
                bar.set_prefix(label.clone());
                bar.set_message(crate::output::LOADING);
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            })
            .collect();

        Self { multi, bars }
    }

    /// Removes the spinners before the final answers are printed
    pub fn clear(&self) {
        for bar in &self.bars {
            bar.finish_and_clear();
        }
        if let Err(e) = self.multi.clear() {
            debug!(error = %e, "Failed to clear progress display");
        }
    }
}

impl TranscriptObserver for StreamProgress {
    fn on_slot_update(&self, handle: SlotHandle, text: &str) {
        if let Some(bar) = self.bars.get(handle.index) {
            bar.set_message(preview(text));
        }
    }

    fn on_slot_settled(&self, handle: SlotHandle, slot: &Slot) {
        if let Some(bar) = self.bars.get(handle.index) {
            match slot.status() {
                SlotStatus::Failed { reason } => bar.finish_with_message(format!("failed: {}", reason)),
                _ => bar.finish_with_message("done"),
            }
        }
    }
}

/// Last characters of the answer on a single line
pub fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let count = flat.chars().count();
    if count <= PREVIEW_CHARS {
        return flat;
    }
    let tail: String = flat.chars().skip(count - PREVIEW_CHARS).collect();
    format!("...{}", tail)
}
