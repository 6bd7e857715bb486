//! `{name}` placeholder substitution.
//!
//! Substitution is a single, non-recursive pass: a substituted value is
//! never scanned for further placeholders. `{{` and `}}` produce literal
//! braces.

use std::collections::HashMap;

use crate::error::{Result, TempleError};

/// Flat variable scope. Each `$INCLUDE` gets its own copy.
pub type Variables = HashMap<String, String>;

const PLACEHOLDER_FORMAT: &str = "{<variable>}";

/// Replace every `{name}` in `line` with its value from `variables`.
///
/// `file` is only used for error messages.
pub fn expand_variables(file: &str, line: &str, variables: &Variables) -> Result<String> {
    if !line.contains(['{', '}']) {
        return Ok(line.to_string());
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(after) = tail.strip_prefix('{') {
            let end = after
                .find(['{', '}'])
                .filter(|&end| after[end..].starts_with('}'))
                .ok_or_else(|| format_error(file, line))?;
            let key = &after[..end];
            let value = variables
                .get(key)
                .ok_or_else(|| TempleError::UnknownVariable {
                    key: key.to_string(),
                    file: file.to_string(),
                    line: line.to_string(),
                })?;
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            // Lone closing brace
            return Err(format_error(file, line));
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn format_error(file: &str, line: &str) -> TempleError {
    TempleError::Format {
        expected: PLACEHOLDER_FORMAT,
        file: file.to_string(),
        line: line.to_string(),
    }
}
