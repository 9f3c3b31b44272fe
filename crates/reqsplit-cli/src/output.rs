use atty::Stream;
use color_eyre::Result;
use reqsplit_core::{CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn emit_output(opts: &OutputOptions, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(opts.no_color, atty::is(Stream::Stdout));

    if opts.json {
        let payload = reqsplit_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let message = reqsplit_core::format_status_message(info, &outcome.message);
    if let CommandStatus::Ok = outcome.status {
        if opts.quiet {
            return Ok(code);
        }
        println!("{}", style.status(&outcome.status, &message));
        for line in body_lines(&style, info, &outcome.details) {
            println!("{line}");
        }
        for line in warning_lines(&outcome.details) {
            println!("{}", style.warning(&line));
        }
    } else {
        let mut lines = vec![style.status(&outcome.status, &message)];
        let reasons = collect_why_bullets(&outcome.details);
        if !reasons.is_empty() {
            lines.push(String::new());
            lines.push("Why:".to_string());
            lines.extend(reasons.into_iter().map(|reason| format!("  • {reason}")));
        }
        if let Some(hint) = outcome.details.get("hint").and_then(Value::as_str) {
            lines.push(String::new());
            lines.push("Fix:".to_string());
            lines.push(style.fix_bullet(&format!("  • {hint}")));
        }
        for line in lines {
            if opts.quiet {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
    }
    Ok(code)
}

fn body_lines(style: &Style, info: CommandInfo, details: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    match info.group {
        CommandGroup::Update => {
            let mode = details.get("mode").and_then(Value::as_str).unwrap_or("write");
            for bucket in ["production", "development"] {
                let Some(section) = details.get(bucket) else {
                    continue;
                };
                let path = section.get("path").and_then(Value::as_str).unwrap_or(bucket);
                if mode == "dry-run" {
                    lines.push(style.heading(&format!("# {path}")));
                    lines.extend(strings(section.get("requirements")));
                } else {
                    let count = section.get("count").and_then(Value::as_u64).unwrap_or(0);
                    lines.push(style.info(&format!("  {path} ({count} {bucket})")));
                }
            }
        }
        CommandGroup::Imports => {
            if let Some(imports) = details.get("imports").and_then(Value::as_array) {
                for entry in imports {
                    let module = entry.get("module").and_then(Value::as_str).unwrap_or_default();
                    let normalized = entry
                        .get("normalized")
                        .and_then(Value::as_str)
                        .unwrap_or(module);
                    if normalized == module {
                        lines.push(format!("  {module}"));
                    } else {
                        lines.push(format!("  {module} → {normalized}"));
                    }
                }
            }
        }
        CommandGroup::Snapshot => {
            lines.extend(
                strings(details.get("packages"))
                    .into_iter()
                    .map(|pin| format!("  {pin}")),
            );
        }
    }
    lines
}

fn warning_lines(details: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(files) = details.get("skipped_files").and_then(Value::as_array) {
        for file in files {
            let path = file.get("path").and_then(Value::as_str).unwrap_or_default();
            let reason = file.get("reason").and_then(Value::as_str).unwrap_or_default();
            lines.push(format!("warning: skipped {path}: {reason}"));
        }
    }
    if let Some(skipped) = details.get("skipped_lines").and_then(Value::as_array) {
        for entry in skipped {
            let line = entry.get("line").and_then(Value::as_u64).unwrap_or_default();
            let reason = entry.get("reason").and_then(Value::as_str).unwrap_or_default();
            lines.push(format!("warning: ignored installed listing line {line}: {reason}"));
        }
    }
    if let Some(collisions) = details.get("collisions").and_then(Value::as_array) {
        for collision in collisions {
            let canonical = collision
                .get("canonical")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let names = strings(collision.get("names")).join(", ");
            lines.push(format!("warning: {names} all normalize to {canonical}"));
        }
    }
    lines
}

fn collect_why_bullets(details: &Value) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(reason) = details.get("reason").and_then(Value::as_str) {
        push_unique(&mut bullets, reason_display(reason).unwrap_or(reason));
    }
    if let Some(detail) = details.get("detail").and_then(Value::as_str) {
        for line in detail.lines().filter(|line| !line.trim().is_empty()) {
            push_unique(&mut bullets, line.trim());
        }
    }
    for path in strings(details.get("stale")) {
        push_unique(&mut bullets, format!("{path} is out of date"));
    }
    bullets
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn push_unique(vec: &mut Vec<String>, text: impl Into<String>) {
    let text = text.into();
    if !vec.contains(&text) {
        vec.push(text);
    }
}

fn reason_display(code: &str) -> Option<&'static str> {
    match code {
        "environment_unavailable" => Some("The installed package set could not be captured."),
        "project_not_found" => Some("The project could not be located."),
        "write_failed" => Some("The requirements files could not be written; nothing was changed."),
        "invalid_config" => Some("The reqsplit configuration is invalid."),
        "requirements_stale" => Some("The requirements files do not match the environment."),
        "internal_error" => Some("reqsplit hit an unexpected error."),
        _ => None,
    }
}
