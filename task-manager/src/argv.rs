//! Shell-style command line splitting
//!
//! Follows POSIX word rules without expansion: whitespace separates words,
//! single quotes are literal, double quotes honour `\"`, `\\`, `\$`, `` \` ``
//! and an escaped newline, and an unquoted backslash escapes the next
//! character.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgvError {
    #[error("Command line is empty")]
    Empty,

    #[error("Unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error("Trailing backslash")]
    TrailingBackslash,
}

/// Split a command line into an argument vector
pub fn parse_command_line(line: &str) -> Result<Vec<String>, ArgvError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(ArgvError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('\n') => {}
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(ArgvError::UnterminatedQuote('"')),
                        },
                        Some(c) => current.push(c),
                        None => return Err(ArgvError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(c) => {
                    in_word = true;
                    current.push(c);
                }
                None => return Err(ArgvError::TrailingBackslash),
            },
            '#' if !in_word => break,
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        args.push(current);
    }

    if args.is_empty() {
        return Err(ArgvError::Empty);
    }

    Ok(args)
}
