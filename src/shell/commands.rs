//! Shell command grammar.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `start-exam [n]`
    StartExam(Option<usize>),
    /// `answer <n>`, 1-based
    Answer(usize),
    CurrentQuestion,
    EndExam,
    /// `refresh-questions [n]`
    Refresh(Option<usize>),
    ClearCache,
    /// `debug [on|off]`; no argument reports the current state
    Debug(Option<bool>),
    /// `debug-request [n]`
    DebugRequest(Option<usize>),
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'exam-help' for the list of commands.")]
    Unknown(String),
    #[error("'{command}' expects a number, got '{value}'")]
    NotANumber { command: &'static str, value: String },
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' takes at most one argument")]
    TooManyArguments(&'static str),
    #[error("'debug' expects on or off, got '{0}'")]
    BadSwitch(String),
}

impl Command {
    /// Parse one input line. Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let extra = words.next().is_some();

        let (key, command) = match name.to_ascii_lowercase().as_str() {
            "start-exam" => ("start-exam", Command::StartExam(number("start-exam", arg)?)),
            "answer" => {
                let n = number("answer", arg)?.ok_or(CommandError::MissingArgument("answer"))?;
                ("answer", Command::Answer(n))
            }
            "current-question" => ("current-question", Command::CurrentQuestion),
            "end-exam" => ("end-exam", Command::EndExam),
            "refresh-questions" => (
                "refresh-questions",
                Command::Refresh(number("refresh-questions", arg)?),
            ),
            "clear-cache" => ("clear-cache", Command::ClearCache),
            "debug" | "debug-claude" => ("debug", Command::Debug(switch(arg)?)),
            "debug-request" => (
                "debug-request",
                Command::DebugRequest(number("debug-request", arg)?),
            ),
            "exam-help" | "help" => ("exam-help", Command::Help),
            "exit" | "quit" => ("exit", Command::Exit),
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        let takes_arg = matches!(
            command,
            Command::StartExam(_)
                | Command::Answer(_)
                | Command::Refresh(_)
                | Command::Debug(_)
                | Command::DebugRequest(_)
        );
        if extra || (arg.is_some() && !takes_arg) {
            return Err(CommandError::TooManyArguments(key));
        }
        Ok(Some(command))
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)?.ok_or_else(|| CommandError::Unknown(String::new()))
    }
}

fn number(command: &'static str, arg: Option<&str>) -> Result<Option<usize>, CommandError> {
    arg.map(|value| {
        value.parse::<usize>().map_err(|_| CommandError::NotANumber {
            command,
            value: value.to_string(),
        })
    })
    .transpose()
}

fn switch(arg: Option<&str>) -> Result<Option<bool>, CommandError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(None),
        Some("on" | "true" | "enable") => Ok(Some(true)),
        Some("off" | "false" | "disable") => Ok(Some(false)),
        Some(other) => Err(CommandError::BadSwitch(other.to_string())),
    }
}
