//! Interactive `.env` setup

use anyhow::Result;
use console::style;
use dialoguer::{Input, Password};
use std::path::Path;
use thoughtchain_provider::provider::{DEFAULT_API_KEY, DEFAULT_BASE_URL};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";

/// Ask for the service credentials and store them in `path`
pub fn run(path: &Path) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    println!("{}", style("ThoughtChain setup").green().bold());
    println!("Leave the key empty to talk to a local server.\n");

    let api_key = Password::new()
        .with_prompt("API key")
        .allow_empty_password(true)
        .interact()?;
    let api_key = match api_key.trim() {
        "" => DEFAULT_API_KEY.to_string(),
        key => key.to_string(),
    };

    let base_url: String = Input::new()
        .with_prompt("Base URL")
        .default(DEFAULT_BASE_URL.to_string())
        .interact_text()?;

    let contents = upsert_env(&existing, API_KEY_VAR, &api_key);
    let contents = upsert_env(&contents, BASE_URL_VAR, base_url.trim());
    std::fs::write(path, contents)?;

    println!("{} Saved {}", style("✓").green(), path.display());
    Ok(())
}

/// Set `key` in dotenv-formatted `contents`, keeping every other line
pub fn upsert_env(contents: &str, key: &str, value: &str) -> String {
    let entry = format!("{}={}", key, quote(value));
    let mut replaced = false;

    let mut lines: Vec<String> = contents
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let is_key = !trimmed.starts_with('#')
                && trimmed
                    .trim_start_matches("export ")
                    .split_once('=')
                    .is_some_and(|(k, _)| k.trim() == key);
            if is_key && !replaced {
                replaced = true;
                entry.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(entry);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Single quotes keep the value literal but cannot hold a `'`; those
/// values go in double quotes with `\`, `"` and `$` escaped.
fn quote(value: &str) -> String {
    let plain = !value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'));
    if plain {
        return value.to_string();
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
