use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vedirect_core::analyze_capture_file;

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let check = std::env::args().skip(1).any(|arg| arg == "--check");
    let mut stale = Vec::new();
    let root = PathBuf::from("tests").join("golden");
    let entries =
        fs::read_dir(&root).map_err(|err| format!("failed to read {}: {}", root.display(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read entry: {}", err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let input = path.join("input.ved");
        if !input.exists() {
            continue;
        }
        let output = path.join("expected_report.json");
        let json = render_report(&input)?;
        if check {
            let current = fs::read_to_string(&output).unwrap_or_default();
            if current != json {
                stale.push(output.display().to_string());
            }
            continue;
        }
        fs::write(&output, json)
            .map_err(|err| format!("failed to write {}: {}", output.display(), err))?;
    }

    if !stale.is_empty() {
        return Err(format!("stale golden reports: {}", stale.join(", ")));
    }
    Ok(())
}

/// Renders the report with the input path relative to the repo root, as stored in fixtures.
fn render_report(input: &Path) -> Result<String, String> {
    let mut report = analyze_capture_file(input)
        .map_err(|err| format!("decoding failed for {}: {}", input.display(), err))?;
    report.input.path = input.display().to_string().replace('\\', "/");
    let mut json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("JSON serialization failed: {}", err))?;
    json.push('\n');
    Ok(json)
}
