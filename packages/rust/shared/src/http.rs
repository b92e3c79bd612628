//! The HTTP client every embedplot request goes through.

use std::time::Duration;

use reqwest::Client;

use crate::error::{EmbedplotError, Result};

/// User-Agent sent with archive and keyword requests.
pub const USER_AGENT: &str = concat!("embedplot/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client. `timeout_secs = None` leaves requests unbounded.
pub fn build_client(timeout_secs: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| EmbedplotError::Transport(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_crate_version() {
        assert!(USER_AGENT.starts_with("embedplot/"));
        assert_eq!(USER_AGENT.trim_start_matches("embedplot/"), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn clients_build_with_and_without_timeout() {
        assert!(build_client(None).is_ok());
        assert!(build_client(Some(30)).is_ok());
    }
}
