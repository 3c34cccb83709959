//! Allergy Lens: food photo → allergen classification → history log.
//!
//! This is the crate shell that wires the domains together. Business logic
//! lives in the domain modules:
//!   - intake/     - staging picked images and encoding their previews
//!   - classify/   - the remote inference client
//!   - history/    - the remote history log client
//!   - pipeline.rs: the submit state machine tying them together
//!   - session.rs  - identity inputs and the `/me` profile lookup
//!   - config.rs   - backend endpoint resolution
//!   - cli.rs      - the command-line driver behind the binary

pub mod classify;
pub mod cli;
pub mod config;
pub mod history;
mod http;
pub mod intake;
pub mod pipeline;
pub mod session;

pub use pipeline::{OrchestratorState, SubmitOutcome, UploadOrchestrator};
pub use session::Session;

/// Load `.env.local` → `.env` and install the logger.
///
/// Safe to call more than once; only the first call installs a logger.
pub fn init() {
    'env_load: for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
