use clap::Parser;
use std::path::PathBuf;

/// Ask questions about up to four images at once, one streamed answer per image
#[derive(Parser, Debug)]
#[command(name = "batchchat", author, version, about, long_about = None)]
pub struct Args {
    /// Image files to chat about (1 to 4)
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// Question to ask about every image; repeat to ask several in order
    #[arg(short, long = "question")]
    pub questions: Vec<String>,

    /// Enter interactive chat mode (the default when no --question is given)
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Completion endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Per-image request timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to a config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the resolved settings to the config file before starting
    #[arg(long, default_value_t = false)]
    pub save_config: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn wants_interactive(&self) -> bool {
        self.interactive || self.questions.is_empty()
    }
}
