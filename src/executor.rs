//! Process execution for firewall-cmd
//!
//! [`CommandExecutor`] is the only way fwrule talks to the firewall engine.
//! It takes a complete command line and blocks until the process exits.
//! Timeouts and cancellation, where needed, belong in an implementation of
//! this trait.

use std::borrow::Cow;
use std::process::Stdio;
use tracing::{debug, error};

use crate::core::error::{Error, Result};

/// Captured result of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
        }
    }
}

/// Runs firewall engine commands.
///
/// Implementations must return `Error::CommandFailed` for a non-zero exit.
pub trait CommandExecutor {
    fn run(&self, command_line: &str) -> Result<CommandOutput>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn run(&self, command_line: &str) -> Result<CommandOutput> {
        (**self).run(command_line)
    }
}

/// Quotes one argument so [`split_command_line`] yields it back unchanged.
///
/// Words without whitespace, quotes or backslashes are returned as-is.
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if plain {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Splits a command line into argv without invoking a shell.
///
/// Single quotes preserve everything literally, double quotes honor `\"` and
/// `\\`, and a bare backslash escapes the next character. An empty quoted
/// string yields an empty argument.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` on an unterminated quote or a trailing
/// backslash.
pub fn split_command_line(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    let unterminated = || Error::InvalidArgument(format!("unterminated quote in: {line}"));

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(unterminated()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(esc @ ('"' | '\\')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(unterminated()),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(unterminated()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => {
                        return Err(Error::InvalidArgument(format!(
                            "trailing backslash in: {line}"
                        )));
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        args.push(current);
    }
    Ok(args)
}

/// Runs commands as real processes, elevating when needed.
///
/// Only `binary` may be executed; any other program in a command line is
/// refused before a process is spawned.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    binary: String,
}

impl SystemExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl CommandExecutor for SystemExecutor {
    fn run(&self, command_line: &str) -> Result<CommandOutput> {
        let argv = split_command_line(command_line)?;
        let Some((program, args)) = argv.split_first() else {
            return Err(Error::InvalidArgument("empty command line".to_string()));
        };

        if *program != self.binary {
            return Err(Error::InvalidArgument(format!(
                "refusing to run '{program}', only '{}' is allowed",
                self.binary
            )));
        }

        debug!("Running: {command_line}");

        let output = crate::elevation::create_elevated_command(program, args)?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                error!("Failed to spawn {program}: {e}");
                Error::CommandFailed {
                    command: command_line.to_string(),
                    stderr: e.to_string(),
                    exit_code: None,
                }
            })?;

        if output.status.success() {
            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                exit_code: output.status.code(),
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(Error::CommandFailed {
                command: command_line.to_string(),
                stderr,
                exit_code: output.status.code(),
            })
        }
    }
}
