//! RigVoice Library
//!
//! Core pipeline for driving a multi-screen geographic display rig from
//! natural-language commands: intent classification and KML generation via
//! interchangeable language-model providers, plus the SSH command engine
//! that renders the result across the cluster.

pub mod cluster;
pub mod config;
pub mod error;
pub mod generator;
pub mod intent;
pub mod llm;
pub mod markup;
pub mod processor;

pub use error::{RigError, RigResult};

/// Install a global tracing subscriber for embedding applications.
///
/// Respects `RUST_LOG` when set, falling back to the given default filter
/// (e.g. `"rigvoice=debug"`). Safe to call once per process.
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
