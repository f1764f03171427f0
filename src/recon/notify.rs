use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;

use crate::error::ReconError;
use crate::recon::config::DevcheckNotifyConfig;
use crate::recon::summary::SummaryStats;
use crate::recon::warn;

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOutcome {
    Skipped,
    Sent,
    Failed,
}

impl NotifyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

pub fn build_message(stats: &SummaryStats, max_listed: usize) -> String {
    let mut lines = vec![
        "Device submission report".to_string(),
        format!(
            "Submitted: {}/{} ({:.1}%)",
            stats.complete,
            stats.total,
            stats.completion_percent()
        ),
    ];
    if stats.pending.is_empty() {
        lines.push("All devices have submitted.".to_string());
        return lines.join("\n");
    }

    lines.push(format!("Not submitted / partial: {}", stats.pending.len()));
    lines.push(format!("Pending devices (first {max_listed}):"));
    for device in stats.pending.iter().take(max_listed) {
        lines.push(format!("- {device}"));
    }
    let rest = stats.pending.len().saturating_sub(max_listed);
    if rest > 0 {
        lines.push(format!("(+{rest} more)"));
    }
    lines.join("\n")
}

pub fn post_message(endpoint: &str, text: &str, timeout_secs: u64) -> Result<(), ReconError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|err| ReconError::NetworkFailure(err.to_string()))?;
    let response = client
        .post(endpoint)
        .json(&ChatPayload { text })
        .send()
        .map_err(|err| ReconError::NetworkFailure(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ReconError::NetworkFailure(format!(
            "endpoint answered with status {}",
            response.status()
        )));
    }
    Ok(())
}

/// Deliver the run summary. Never fails the caller; delivery problems become
/// a warning line and a `Failed` outcome.
pub fn notify(config: &DevcheckNotifyConfig, stats: &SummaryStats) -> NotifyOutcome {
    let Some(endpoint) = config.endpoint.as_deref() else {
        return NotifyOutcome::Skipped;
    };
    let text = build_message(stats, config.max_listed);
    match post_message(endpoint, &text, config.timeout_secs) {
        Ok(()) => NotifyOutcome::Sent,
        Err(err) => {
            warn::emit_error("notify", "post", endpoint, "notification-not-delivered", &err);
            NotifyOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: usize, complete: usize, pending: &[&str]) -> SummaryStats {
        SummaryStats {
            total,
            complete,
            partial: 0,
            incomplete: pending.len(),
            pending: pending.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn lists_pending_devices() {
        let message = build_message(&stats(3, 1, &["B", "C"]), 10);
        assert_eq!(
            message,
            "Device submission report\nSubmitted: 1/3 (33.3%)\nNot submitted / partial: 2\nPending devices (first 10):\n- B\n- C"
        );
    }

    #[test]
    fn truncates_long_lists() {
        let pending = ["D1", "D2", "D3", "D4", "D5"];
        let message = build_message(&stats(5, 0, &pending), 2);
        assert!(message.contains("Pending devices (first 2):\n- D1\n- D2\n(+3 more)"));
        assert!(!message.contains("D3"));
    }

    #[test]
    fn all_complete_message() {
        let message = build_message(&stats(4, 4, &[]), 10);
        assert_eq!(
            message,
            "Device submission report\nSubmitted: 4/4 (100.0%)\nAll devices have submitted."
        );
    }

    #[test]
    fn no_endpoint_skips_delivery() {
        let config = DevcheckNotifyConfig {
            endpoint: None,
            ..DevcheckNotifyConfig::default()
        };
        assert_eq!(notify(&config, &stats(1, 1, &[])), NotifyOutcome::Skipped);
    }

    #[test]
    fn unreachable_endpoint_is_a_soft_failure() {
        let config = DevcheckNotifyConfig {
            endpoint: Some("http://127.0.0.1:9/hook".to_string()),
            max_listed: 10,
            timeout_secs: 1,
        };
        assert_eq!(notify(&config, &stats(2, 1, &["B"])), NotifyOutcome::Failed);
    }
}
