//! Client side of the API: an HTTP client, the results poller, a session
//! history and the plain-text report. Used by the `match-demo` binary.

use thiserror::Error;

pub mod client;
pub mod poller;
pub mod report;
pub mod samples;
pub mod session;

pub use client::ApiClient;
pub use poller::{poll_for_results, PollConfig, PollOutcome, ResultsSource};
pub use session::Session;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis not found")]
    NotFound,

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },
}
