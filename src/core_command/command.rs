use crate::core_command::reply::{TOO_FEW_ARGUMENTS, TOO_MANY_ARGUMENTS, UNKNOWN_COMMAND};
use thiserror::Error;

/// A parsed control-channel line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ls,
    Cd(String),
    Get(String),
    Bye,
    /// Blank line; answered with an empty reply block.
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{verb}: too many arguments")]
    TooManyArguments { verb: String },

    #[error("{verb}: too few arguments")]
    TooFewArguments { verb: String },

    #[error("unknown command: {0}")]
    Unknown(String),
}

impl CommandError {
    pub fn to_reply(&self) -> &'static str {
        match self {
            CommandError::TooManyArguments { .. } => TOO_MANY_ARGUMENTS,
            CommandError::TooFewArguments { .. } => TOO_FEW_ARGUMENTS,
            CommandError::Unknown(_) => UNKNOWN_COMMAND,
        }
    }
}

impl Command {
    /// Splits `line` on whitespace; the first token is the verb.
    ///
    /// `cd..` is the legacy spelling of `cd ..`. `bye` with arguments is not
    /// a termination request and is reported as an unknown command.
    pub fn parse(line: &str) -> Result<Command, CommandError> {
        let mut parts = line.split_whitespace();
        let verb = match parts.next() {
            Some(verb) => verb,
            None => return Ok(Command::Empty),
        };
        let args: Vec<&str> = parts.collect();

        match verb {
            "ls" => {
                expect_arity(verb, &args, 0)?;
                Ok(Command::Ls)
            }
            "cd.." => {
                expect_arity(verb, &args, 0)?;
                Ok(Command::Cd("..".to_string()))
            }
            "cd" => {
                expect_arity(verb, &args, 1)?;
                Ok(Command::Cd(args[0].to_string()))
            }
            "get" => {
                expect_arity(verb, &args, 1)?;
                Ok(Command::Get(args[0].to_string()))
            }
            "bye" if args.is_empty() => Ok(Command::Bye),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

fn expect_arity(verb: &str, args: &[&str], expected: usize) -> Result<(), CommandError> {
    if args.len() > expected {
        Err(CommandError::TooManyArguments {
            verb: verb.to_string(),
        })
    } else if args.len() < expected {
        Err(CommandError::TooFewArguments {
            verb: verb.to_string(),
        })
    } else {
        Ok(())
    }
}
