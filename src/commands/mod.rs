pub mod archive;
pub mod menu;
pub mod reconcile;
pub mod report_overall;
pub mod report_trend;
pub mod run_all;
pub mod status;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{}: {}\n",
            self.command,
            if self.ok { "ok" } else { "issues found" }
        );
        for detail in &self.details {
            out.push_str(&format!("  {detail}\n"));
        }
        for issue in &self.issues {
            out.push_str(&format!("  ! {issue}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_flip_ok_and_survive_merge() {
        let mut parent = CommandReport::new("run-all");
        let mut child = CommandReport::new("archive");
        child.detail("browser_log archived=1");
        child.issue("face_photo folder unavailable");
        parent.merge(child);

        assert!(!parent.ok);
        assert_eq!(parent.details, vec!["browser_log archived=1".to_string()]);
        let text = parent.render_text();
        assert!(text.starts_with("run-all: issues found\n"));
        assert!(text.contains("  ! face_photo folder unavailable\n"));
    }
}
