//! Line-oriented operator console.
//!
//! Parses one stdin line into a [`Command`].  Accepted forms:
//!
//! | Line                                   | Command               |
//! |----------------------------------------|-----------------------|
//! | `run <valve> <seconds>`                | `Run`                 |
//! | `{"valve":1,"duration_ms":60000}`      | `Run`                 |
//! | `test <valve>`                         | `TestValve`           |
//! | `stop` / `status` / `health` / `config`| the matching command  |
//! | `quit` / `exit`                        | `Quit`                |
//!
//! Blank lines and `#` comments parse to `None`.

use core::fmt;
use core::time::Duration;

use crate::app::commands::Command;
use crate::app::job::IrrigationJob;
use crate::pins::ValveNumber;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    BadNumber(String),
    BadJob,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(word) => write!(f, "unknown command '{word}'"),
            Self::MissingArgument(name) => write!(f, "missing <{name}>"),
            Self::BadNumber(text) => write!(f, "'{text}' is not a number"),
            Self::BadJob => write!(f, "malformed job object"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.starts_with('{') {
        let job: IrrigationJob = serde_json::from_str(line).map_err(|_| ParseError::BadJob)?;
        return Ok(Some(Command::Run(job)));
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "run" => {
            let valve = number::<ValveNumber>(words.next(), "valve")?;
            let secs = number::<u64>(words.next(), "seconds")?;
            Command::Run(IrrigationJob::new(valve, Duration::from_secs(secs)))
        }
        "test" => Command::TestValve(number(words.next(), "valve")?),
        "stop" => Command::Stop,
        "status" => Command::Status,
        "health" => Command::Health,
        "config" => Command::ShowConfig,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::UnknownCommand(other.into())),
    };
    Ok(Some(command))
}

fn number<T: core::str::FromStr>(word: Option<&str>, name: &'static str) -> Result<T, ParseError> {
    let word = word.ok_or(ParseError::MissingArgument(name))?;
    word.parse().map_err(|_| ParseError::BadNumber(word.into()))
}
