use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::ReconError;
use crate::recon::warn;

/// One browser profile as written by the inventory collector. The collector
/// also records `browser`, `profile`, `user_name` and `gaia_name`; only the
/// extension list matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserProfile {
    #[serde(default)]
    pub extensions: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadSummary {
    pub profiles: usize,
    pub extensions: usize,
}

pub fn summarize(raw: &str) -> Result<PayloadSummary, serde_json::Error> {
    let profiles: Vec<BrowserProfile> = serde_json::from_str(raw)?;
    Ok(PayloadSummary {
        profiles: profiles.len(),
        extensions: profiles.iter().map(|p| p.extensions.len()).sum(),
    })
}

pub fn extension_count(path: &Path) -> Result<PayloadSummary, ReconError> {
    let raw = fs::read_to_string(path).map_err(|err| ReconError::io(path, err))?;
    summarize(&raw).map_err(|err| ReconError::parse(path.display().to_string(), err))
}

/// Extension total for one inventory file; unreadable payloads count as 0.
pub fn extension_count_or_zero(path: &Path) -> usize {
    match extension_count(path) {
        Ok(summary) => summary.extensions,
        Err(err) => {
            warn::emit_error(
                "inspect",
                "count-extensions",
                &path.display().to_string(),
                "payload-unreadable-counted-as-zero",
                &err,
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sums_extensions_across_profiles() {
        let raw = r#"[
            {"browser": "chrome", "profile": "Default", "user_name": "alice@example.test",
             "extensions": [{"id": "a"}, {"id": "b"}]},
            {"browser": "edge", "profile": "Profile 1", "extensions": [{"id": "c"}]},
            {"browser": "edge", "profile": "Profile 2"}
        ]"#;
        let got = summarize(raw).expect("summarize");
        assert_eq!(got.profiles, 3);
        assert_eq!(got.extensions, 3);
    }

    #[test]
    fn empty_inventory_counts_zero() {
        assert_eq!(summarize("[]").expect("summarize").extensions, 0);
    }

    #[test]
    fn non_array_documents_are_parse_failures() {
        assert!(summarize(r#"{"extensions": []}"#).is_err());
        assert!(summarize(r#"[{"extensions": "many"}]"#).is_err());
    }

    #[test]
    fn unreadable_files_fail_soft() {
        let tmp = tempdir().expect("tempdir");
        let broken = tmp.path().join("PC01_alice_2024-05-01_103000.json");
        fs::write(&broken, "{not json").expect("write");
        assert!(matches!(
            extension_count(&broken),
            Err(ReconError::ParseFailure { .. })
        ));
        assert_eq!(extension_count_or_zero(&broken), 0);
        assert_eq!(extension_count_or_zero(&tmp.path().join("missing.json")), 0);

        let good = tmp.path().join("PC02_bob_2024-05-01_103000.json");
        fs::write(&good, r#"[{"extensions": [1, 2, 3, 4]}]"#).expect("write");
        assert_eq!(extension_count_or_zero(&good), 4);
    }
}
