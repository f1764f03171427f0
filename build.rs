use regex::Regex;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Names that look like settings but are log markers or warn codes.
const NOT_SETTINGS: &[&str] = &["DEVCHECK_WARN"];

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
            out.push(path);
        }
    }
    Ok(())
}

/// Every quoted `"DEVCHECK_*"` literal in the source tree. Only string
/// literals count, so doc text and identifiers never leak into the list.
fn collect_setting_names(files: &[PathBuf]) -> std::io::Result<BTreeSet<String>> {
    let pattern = Regex::new(r#""(DEVCHECK_[A-Z0-9_]*[A-Z0-9])""#).expect("valid pattern");
    let mut names = BTreeSet::new();
    for file in files {
        let source = fs::read_to_string(file)?;
        names.extend(
            pattern
                .captures_iter(&source)
                .map(|caps| caps[1].to_string())
                .filter(|name| !NOT_SETTINGS.contains(&name.as_str())),
        );
    }
    Ok(names)
}

fn write_generated_allowlist() -> std::io::Result<()> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files)?;
    files.sort();
    let names = collect_setting_names(&files)?;

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let mut f = fs::File::create(Path::new(&out_dir).join("devcheck_env_allowlist.rs"))?;
    writeln!(f, "pub const GENERATED_ENV_ALLOWLIST: &[&str] = &[")?;
    for name in names {
        writeln!(f, "    \"{name}\",")?;
    }
    writeln!(f, "];")?;
    Ok(())
}

fn main() {
    write_generated_allowlist().expect("failed to generate DEVCHECK setting allowlist");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
