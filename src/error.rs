//! Failure taxonomy for outbound lookups.
//!
//! Every remote call (knowledge providers, translation, generation) reports
//! failures as a [`LookupError`]. A lookup that succeeds but finds nothing is
//! not an error: providers report it as
//! [`ProviderOutcome::Absent`](crate::models::ProviderOutcome::Absent).

/// Why an outbound call could not produce a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Network failure, timeout, non-2xx status, or missing credentials.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered, but not in the shape we expected.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl LookupError {
    /// Classify a `reqwest` error. Decoding errors are parse failures,
    /// everything else (connect, timeout, redirect) is transport.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Parse(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }

    /// Build a transport failure for a non-2xx response.
    pub fn status(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        LookupError::Transport(format!(
            "{} returned {}: {}",
            service,
            status,
            truncate_body(body)
        ))
    }
}

/// Keep error bodies short enough to log on one line.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{}…", cut)
    }
}
