//! Source code, chunked by top-level definitions.

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::ParseError;

#[allow(clippy::expect_used)]
static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:(?:pub(?:\([^)]*\))?|export|default|async|public|private|protected|internal|static|final|abstract|sealed|unsafe|extern(?:\s+"[^"]*")?)\s+)*(?:def|class|fn|struct|enum|trait|impl|mod|function\*?|func|interface|macro_rules!)(?:\s+[A-Za-z_(]|<)"#,
    )
    .expect("definition pattern is valid")
});

fn is_decorator(line: &str) -> bool {
    line.starts_with('@') || line.starts_with("#[")
}

/// Splits code into one chunk per top-level definition.
///
/// Decorators and attributes directly above a definition belong to it.
/// Lines before the first definition are dropped. A file with no
/// definitions becomes a single chunk.
pub fn chunk_code(content: &[u8]) -> Result<Vec<String>, ParseError> {
    let source = std::str::from_utf8(content)?;

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    let mut in_decorators = false;

    for line in source.lines() {
        let starts_block = if is_decorator(line) {
            let fresh = !in_decorators;
            in_decorators = true;
            fresh
        } else if DEFINITION.is_match(line) {
            let fresh = !in_decorators;
            in_decorators = false;
            fresh
        } else {
            in_decorators = false;
            false
        };

        if starts_block {
            if let Some(lines) = current.take() {
                push_chunk(&mut chunks, &lines);
            }
            current = Some(vec![line]);
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some(lines) = current {
        push_chunk(&mut chunks, &lines);
    }

    if chunks.is_empty() && !source.trim().is_empty() {
        chunks.push(source.to_string());
    }

    Ok(chunks)
}

fn push_chunk(chunks: &mut Vec<String>, lines: &[&str]) {
    let chunk = lines.join("\n").trim_end().to_string();
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
}
