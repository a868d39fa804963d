use anyhow::{Context, Result};
use batchchat_core::CancellationToken;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Exit status used when Ctrl-C ends the process at the prompt
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Routes Ctrl-C to the question in flight, or ends the process while idle.
///
/// One handler serves the whole session; each dispatch registers its token for as long
/// as its [`DispatchGuard`] lives.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Installs the process-wide Ctrl-C handler. Call once per process.
    pub fn install(&self) -> Result<()> {
        let interrupts = self.clone();
        ctrlc::set_handler(move || {
            if !interrupts.interrupt() {
                eprintln!();
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
        .context("Failed to set Ctrl-C handler")
    }

    /// Cancels the dispatch in flight. Returns false when nothing was running.
    pub fn interrupt(&self) -> bool {
        let token = self.active.lock().ok().and_then(|active| active.clone());
        match token {
            Some(token) => {
                info!("Interrupted, cancelling the current question");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Registers a fresh token for one dispatch.
    pub fn begin_dispatch(&self) -> DispatchGuard<'_> {
        let token = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            *active = Some(token.clone());
        }
        DispatchGuard {
            interrupts: self,
            token,
        }
    }
}

/// Keeps a dispatch's token registered until dropped
pub struct DispatchGuard<'a> {
    interrupts: &'a Interrupts,
    token: CancellationToken,
}

impl DispatchGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.interrupts.active.lock() {
            *active = None;
        }
    }
}
