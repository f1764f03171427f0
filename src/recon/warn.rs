use crate::error::ReconError;

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub action: &'a str,
    pub target: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

pub fn render(event: &WarnEvent<'_>) -> String {
    format!(
        "DEVCHECK_WARN code={} stage={} action={} target={} reason={} err={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.action),
        sanitize_value(event.target),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", render(&event));
}

/// Emit a warning line for a recoverable [`ReconError`].
pub fn emit_error(stage: &str, action: &str, target: &str, reason: &str, err: &ReconError) {
    emit(WarnEvent {
        code: err.code().as_str(),
        stage,
        action,
        target,
        reason,
        err: &err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_value_rewrites_whitespace() {
        assert_eq!(sanitize_value("a b\tc"), "a_b_c");
        assert_eq!(sanitize_value("端末 台帳"), "端末_台帳");
    }

    #[test]
    fn sanitize_value_falls_back_for_empty() {
        assert_eq!(sanitize_value("   "), "na");
    }

    #[test]
    fn render_keeps_field_order() {
        let line = render(&WarnEvent {
            code: "E003_IO_FAILURE",
            stage: "archive",
            action: "copy",
            target: "/srv/logs/PC01 a.json",
            reason: "copy-failed",
            err: "",
        });
        assert_eq!(
            line,
            "DEVCHECK_WARN code=E003_IO_FAILURE stage=archive action=copy target=/srv/logs/PC01_a.json reason=copy-failed err=na"
        );
    }
}
