//! Commands sent over the control channel

use crate::constants::API_COMMAND;
use std::fmt;

/// A single `api` command: name plus argument string
///
/// Built per request and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: String,
}

impl Command {
    /// Command with arguments
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
        }
    }

    /// Command without arguments
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, String::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    /// Frame written to the socket, terminated by the blank line ESL expects
    pub fn wire(&self) -> String {
        format!("{}\n\n", self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{} {}", API_COMMAND, self.name)
        } else {
            write!(f, "{} {} {}", API_COMMAND, self.name, self.args)
        }
    }
}
