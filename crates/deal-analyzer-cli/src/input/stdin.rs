use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialize a piped document. YAML is a superset of JSON, so either works.
/// `Ok(None)` when stdin is a terminal or empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped<T: DeserializeOwned>(text: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(text)
        .map(Some)
        .map_err(|e| format!("Failed to parse stdin as JSON or YAML: {e}").into())
}
