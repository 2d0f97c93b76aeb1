//! Msh line parser
//!
//! Turns a raw input line into the structural `CommandLine` the executor
//! consumes: whitespace-separated words with single/double-quote grouping,
//! `|` between pipeline stages, `<`/`>`/`2>` redirections (attached or
//! spaced), and a trailing `&` for background execution.

pub use self::ast::{Command, CommandLine};

pub mod ast;

use std::mem;

use crate::errors::{Error, Result};
use crate::redirect::{RedirectSet, StreamRole};

#[derive(Debug, PartialEq)]
struct Token {
    text: String,
    /// Quoted words are never interpreted as operators.
    quoted: bool,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut quoted = false;
    let mut in_token = false;

    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            in_token = true;
            quoted = true;
            let mut closed = false;
            for inner in &mut chars {
                if inner == c {
                    closed = true;
                    break;
                }
                text.push(inner);
            }
            if !closed {
                return Err(Error::syntax(input));
            }
        } else if c.is_whitespace() {
            if in_token {
                tokens.push(Token {
                    text: mem::replace(&mut text, String::new()),
                    quoted,
                });
                in_token = false;
                quoted = false;
            }
        } else {
            in_token = true;
            text.push(c);
        }
    }
    if in_token {
        tokens.push(Token { text, quoted });
    }

    Ok(tokens)
}

impl CommandLine {
    /// Parses one raw input line. Blank input yields `None`.
    pub fn parse(input: &str) -> Result<Option<CommandLine>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let tokens = tokenize(trimmed)?;
        let mut commands = Vec::new();
        let mut argv: Vec<String> = Vec::new();
        let mut redirects = RedirectSet::default();
        let mut background = false;
        let mut pending: Option<StreamRole> = None;

        for token in &tokens {
            if background {
                // '&' only terminates a line
                return Err(Error::syntax(trimmed));
            }
            if let Some(role) = pending.take() {
                assign(&mut redirects, role, &token.text);
                continue;
            }
            if token.quoted {
                argv.push(token.text.clone());
                continue;
            }
            match token.text.as_str() {
                "|" => {
                    if argv.is_empty() {
                        return Err(Error::syntax(trimmed));
                    }
                    commands.push(Command {
                        argv: mem::replace(&mut argv, Vec::new()),
                    });
                }
                "&" => background = true,
                "<" => pending = Some(StreamRole::Input),
                ">" => pending = Some(StreamRole::Output),
                "2>" => pending = Some(StreamRole::Error),
                text if text.starts_with("2>") => {
                    assign(&mut redirects, StreamRole::Error, &text[2..])
                }
                text if text.starts_with('<') => {
                    assign(&mut redirects, StreamRole::Input, &text[1..])
                }
                text if text.starts_with('>') => {
                    assign(&mut redirects, StreamRole::Output, &text[1..])
                }
                _ => argv.push(token.text.clone()),
            }
        }

        if pending.is_some() || argv.is_empty() {
            return Err(Error::syntax(trimmed));
        }
        commands.push(Command { argv });

        Ok(Some(CommandLine {
            input: trimmed.to_string(),
            commands,
            redirects,
            background,
        }))
    }
}

fn assign(redirects: &mut RedirectSet, role: StreamRole, filename: &str) {
    let filename = Some(filename.to_string());
    match role {
        StreamRole::Input => redirects.input = filename,
        StreamRole::Output => redirects.output = filename,
        StreamRole::Error => redirects.error = filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(argv: &[&str]) -> Command {
        Command {
            argv: argv.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn single(input: &str, argv: &[&str]) -> CommandLine {
        CommandLine {
            input: input.to_string(),
            commands: vec![command(argv)],
            redirects: RedirectSet::default(),
            background: false,
        }
    }

    #[test]
    fn test_empty() {
        assert!(CommandLine::parse("").unwrap().is_none());
        assert!(CommandLine::parse("   \t").unwrap().is_none());
    }

    #[test]
    fn test_program_and_args() {
        let line = CommandLine::parse("cc -o prog main.c").unwrap().unwrap();
        let command = &line.commands[0];
        assert_eq!(command.program(), "cc");
        assert_eq!(command.args(), ["-o", "prog", "main.c"]);

        let line = CommandLine::parse("true").unwrap().unwrap();
        assert!(line.commands[0].args().is_empty());
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(
            CommandLine::parse("echo bob").unwrap().unwrap(),
            single("echo bob", &["echo", "bob"])
        );
    }

    #[test]
    fn test_infile() {
        for input in &["cat <in", "cat < in"] {
            let line = CommandLine::parse(input).unwrap().unwrap();
            assert_eq!(line.commands, vec![command(&["cat"])]);
            assert_eq!(line.redirects.input, Some("in".to_string()));
        }
        assert!(CommandLine::parse("cat <").is_err());
    }

    #[test]
    fn test_outfile() {
        for input in &["echo bob >out", "echo bob > out"] {
            let line = CommandLine::parse(input).unwrap().unwrap();
            assert_eq!(line.commands, vec![command(&["echo", "bob"])]);
            assert_eq!(line.redirects.output, Some("out".to_string()));
        }
        assert!(CommandLine::parse("echo >").is_err());
    }

    #[test]
    fn test_errfile() {
        for input in &["cc bad.c 2>err", "cc bad.c 2> err"] {
            let line = CommandLine::parse(input).unwrap().unwrap();
            assert_eq!(line.commands, vec![command(&["cc", "bad.c"])]);
            assert_eq!(line.redirects.error, Some("err".to_string()));
        }
    }

    #[test]
    fn test_pipeline() {
        let line = CommandLine::parse("cmd1 | cmd2 arg | cmd3").unwrap().unwrap();
        assert_eq!(
            line.commands,
            vec![
                command(&["cmd1"]),
                command(&["cmd2", "arg"]),
                command(&["cmd3"]),
            ]
        );
        assert!(!line.background);
        assert!(CommandLine::parse("cmd1 | | cmd3").is_err());
        assert!(CommandLine::parse("cmd1 |").is_err());
    }

    #[test]
    fn test_background() {
        let line = CommandLine::parse("sleep 5 &").unwrap().unwrap();
        assert!(line.background);
        assert_eq!(line.input, "sleep 5 &");
        assert_eq!(line.commands, vec![command(&["sleep", "5"])]);

        assert!(CommandLine::parse("sleep 5 & jobs").is_err());
    }

    #[test]
    fn test_pipeline_with_redirects_and_background() {
        let line = CommandLine::parse("<in cmd1 | cmd2 >out &").unwrap().unwrap();
        assert_eq!(line.commands, vec![command(&["cmd1"]), command(&["cmd2"])]);
        assert_eq!(line.redirects.input, Some("in".to_string()));
        assert_eq!(line.redirects.output, Some("out".to_string()));
        assert!(line.background);
    }

    #[test]
    fn test_quotes() {
        let line = CommandLine::parse("echo 'arg arg arg'").unwrap().unwrap();
        assert_eq!(line.commands, vec![command(&["echo", "arg arg arg"])]);

        // quoted operators are plain words
        let line = CommandLine::parse("echo '|' \">\"").unwrap().unwrap();
        assert_eq!(line.commands, vec![command(&["echo", "|", ">"])]);

        assert!(CommandLine::parse("echo 'unterminated").is_err());
    }
}
