//! Plain text and markup.

use crate::errors::ParseError;

/// Splits text into blank-line separated elements.
pub fn chunk_text(content: &[u8]) -> Result<Vec<String>, ParseError> {
    let text = std::str::from_utf8(content)?;

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut chunks);
        } else {
            current.push(line.trim_end());
        }
    }
    flush(&mut current, &mut chunks);

    Ok(chunks)
}

fn flush(lines: &mut Vec<&str>, chunks: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let element = lines.join("\n").trim().to_string();
    if !element.is_empty() {
        chunks.push(element);
    }
    lines.clear();
}
