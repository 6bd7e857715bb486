//! Line-oriented template processing.
//!
//! Each line of a template is, in order of precedence:
//!
//! - a comment (`;` in column 0), kept unless `config.skip` contains `comment`
//! - `$ADDRESS <group> <prefix>`, replaced by `A`/`AAAA` records
//! - `$INCLUDE <file> [<var>=<value>...]`, replaced by the processed file
//! - `$DEFAULT <var> <value>`, which sets a variable if it is unset or empty
//! - any other `$` directive, passed through
//! - a blank line, kept unless `config.skip` contains `empty`
//! - a record line, passed through
//!
//! Every line except comments is variable-substituted first.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::address::expand_address;
use crate::config::Config;
use crate::error::{Result, TempleError};
use crate::variables::{expand_variables, Variables};

const INCLUDE_FORMAT: &str = "$INCLUDE <file> [<var>=<value>…]";
const DEFAULT_FORMAT: &str = "$DEFAULT <variable> <value>";

/// Maximum `$INCLUDE` nesting.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Split `line` at whitespace runs into at most `maxsplit + 1` fields; the
/// last field is the unsplit remainder of the line.
pub(crate) fn split_fields(line: &str, maxsplit: usize) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = line.trim_start();
    while !rest.is_empty() {
        if fields.len() == maxsplit {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    fields
}

/// Expands templates against a configuration.
///
/// The configuration is shared by every file and include; variables are
/// passed per call so that each `$INCLUDE` works on its own copy.
#[derive(Debug, Clone, Copy)]
pub struct TemplateProcessor<'a> {
    config: &'a Config,
}

impl<'a> TemplateProcessor<'a> {
    /// Create a processor for `config`.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Process the template at `path`, returning the output lines.
    ///
    /// `$DEFAULT` directives at the top level update `variables`.
    pub fn process(&self, path: &Path, variables: &mut Variables) -> Result<Vec<String>> {
        let mut stack = Vec::new();
        self.process_nested(path, variables, &mut stack)
    }

    fn process_nested(
        &self,
        path: &Path,
        variables: &mut Variables,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Vec<String>> {
        let file = path.display().to_string();
        if stack.len() >= MAX_INCLUDE_DEPTH || stack.iter().any(|p| p == path) {
            return Err(TempleError::IncludeLoop { file });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| TempleError::io(path, e))?;
        debug!(file = %file, depth = stack.len(), "processing template");

        stack.push(path.to_path_buf());
        let mut output = Vec::new();
        let mut expect_name = true;
        for raw in contents.lines() {
            self.process_line(&file, raw.trim_end(), variables, stack, &mut expect_name, &mut output)?;
        }
        stack.pop();
        Ok(output)
    }

    fn process_line(
        &self,
        file: &str,
        line: &str,
        variables: &mut Variables,
        stack: &mut Vec<PathBuf>,
        expect_name: &mut bool,
        output: &mut Vec<String>,
    ) -> Result<()> {
        let line: Cow<'_, str> = if line.starts_with(';') {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(expand_variables(file, line, variables)?)
        };
        let skip = self.config.config.skip;

        if line.starts_with(';') {
            if !skip.comment {
                output.push(line.into_owned());
            }
            return Ok(());
        }

        if line.starts_with('$') {
            *expect_name = true;
            let directive = line.split_whitespace().next().unwrap_or_default();
            match directive {
                "$ADDRESS" => {
                    let records =
                        expand_address(file, &line, &self.config.addresses, variables)
                            .map_err(|e| in_template(file, &line, e))?;
                    output.extend(records);
                }
                "$INCLUDE" => {
                    let included = self.include(file, &line, variables, stack)?;
                    output.extend(included);
                }
                "$DEFAULT" => apply_default(file, &line, variables)?,
                _ => output.push(line.to_string()),
            }
            return Ok(());
        }

        if line.is_empty() {
            if !skip.empty {
                output.push(String::new());
            }
            return Ok(());
        }

        if *expect_name && line.starts_with([' ', '\t']) {
            warn!("Line may have undefined name in {file}: {line}");
        }
        *expect_name = false;
        output.push(line.into_owned());
        Ok(())
    }

    /// Handle `$INCLUDE <file> [<var>=<value>...]`.
    ///
    /// The included file sees a copy of the current variables with the
    /// assignments applied; nothing it sets is visible afterwards.
    fn include(
        &self,
        file: &str,
        line: &str,
        variables: &Variables,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Vec<String>> {
        let format_error = || TempleError::Format {
            expected: INCLUDE_FORMAT,
            file: file.to_string(),
            line: line.to_string(),
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let target = *fields.get(1).ok_or_else(format_error)?;

        let mut scoped = variables.clone();
        for assignment in &fields[2..] {
            let (key, value) = assignment.split_once('=').ok_or_else(format_error)?;
            scoped.insert(key.to_string(), value.to_string());
        }

        debug!(from = file, include = target, "including template");
        self.process_nested(Path::new(target), &mut scoped, stack)
            .map_err(|e| in_template(file, line, e))
    }
}

/// Handle `$DEFAULT <var> <value>`: set `var` unless it already has a
/// non-empty value.
fn apply_default(file: &str, line: &str, variables: &mut Variables) -> Result<()> {
    let fields = split_fields(line, 2);
    let &[_, name, value] = fields.as_slice() else {
        return Err(TempleError::Format {
            expected: DEFAULT_FORMAT,
            file: file.to_string(),
            line: line.to_string(),
        });
    };
    let current = variables.entry(name.to_string()).or_default();
    if current.is_empty() {
        *current = value.to_string();
    }
    Ok(())
}

fn in_template(file: &str, line: &str, err: TempleError) -> TempleError {
    match err {
        TempleError::UnknownAddress { .. }
        | TempleError::AddressTooDeep { .. }
        | TempleError::IncludeLoop { .. } => TempleError::InTemplate {
            file: file.to_string(),
            line: line.to_string(),
            source: Box::new(err),
        },
        other => other,
    }
}
