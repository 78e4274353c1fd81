//! Request parsing.
//!
//! A request is one line of ASCII-whitespace separated fields. The verb is
//! case-insensitive; every other field is taken byte-exact.

use std::fmt;

use crate::domain::{ProtocolError, QueueName, TaskId};

/// The four operations of the broker, with typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        queue: QueueName,
        length: u64,
        payload: Vec<u8>,
    },
    Get {
        queue: QueueName,
    },
    Ack {
        queue: QueueName,
        id: TaskId,
    },
    In {
        queue: QueueName,
        id: TaskId,
    },
}

/// Command without its fields. Used to decode replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Add,
    Get,
    Ack,
    In,
}

impl CommandKind {
    pub fn verb(self) -> &'static str {
        match self {
            CommandKind::Add => "ADD",
            CommandKind::Get => "GET",
            CommandKind::Ack => "ACK",
            CommandKind::In => "IN",
        }
    }

    /// Number of fields after the verb.
    fn arity(self) -> usize {
        match self {
            CommandKind::Add => 3,
            CommandKind::Get => 1,
            CommandKind::Ack | CommandKind::In => 2,
        }
    }

    fn from_verb(verb: &[u8]) -> Option<Self> {
        [
            CommandKind::Add,
            CommandKind::Get,
            CommandKind::Ack,
            CommandKind::In,
        ]
        .into_iter()
        .find(|kind| verb.eq_ignore_ascii_case(kind.verb().as_bytes()))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl Command {
    /// Parse one raw request.
    pub fn parse(request: &[u8]) -> Result<Self, ProtocolError> {
        let mut fields = request
            .split(u8::is_ascii_whitespace)
            .filter(|field| !field.is_empty());

        let verb = fields.next().ok_or(ProtocolError::Empty)?;
        let kind = CommandKind::from_verb(verb).ok_or_else(|| {
            ProtocolError::UnknownCommand(String::from_utf8_lossy(verb).into_owned())
        })?;

        let args: Vec<&[u8]> = fields.collect();
        if args.len() != kind.arity() {
            return Err(ProtocolError::Arity {
                command: kind.verb(),
                expected: kind.arity(),
                got: args.len(),
            });
        }

        let queue = QueueName::new(utf8(args[0], "queue")?);
        let command = match kind {
            CommandKind::Add => Command::Add {
                queue,
                length: parse_length(args[1])?,
                payload: args[2].to_vec(),
            },
            CommandKind::Get => Command::Get { queue },
            CommandKind::Ack => Command::Ack {
                queue,
                id: TaskId::new(utf8(args[1], "task id")?),
            },
            CommandKind::In => Command::In {
                queue,
                id: TaskId::new(utf8(args[1], "task id")?),
            },
        };
        Ok(command)
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Add { .. } => CommandKind::Add,
            Command::Get { .. } => CommandKind::Get,
            Command::Ack { .. } => CommandKind::Ack,
            Command::In { .. } => CommandKind::In,
        }
    }

    pub fn queue(&self) -> &QueueName {
        match self {
            Command::Add { queue, .. }
            | Command::Get { queue }
            | Command::Ack { queue, .. }
            | Command::In { queue, .. } => queue,
        }
    }

    /// Wire form of the command, without a terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("{} {}", self.kind().verb(), self.queue()).into_bytes();
        match self {
            Command::Add {
                length, payload, ..
            } => {
                out.extend_from_slice(format!(" {length} ").as_bytes());
                out.extend_from_slice(payload);
            }
            Command::Get { .. } => {}
            Command::Ack { id, .. } | Command::In { id, .. } => {
                out.push(b' ');
                out.extend_from_slice(id.as_str().as_bytes());
            }
        }
        out
    }
}

fn utf8(field: &[u8], name: &'static str) -> Result<String, ProtocolError> {
    std::str::from_utf8(field)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidUtf8 { field: name })
}

fn parse_length(field: &[u8]) -> Result<u64, ProtocolError> {
    let invalid = || ProtocolError::InvalidLength(String::from_utf8_lossy(field).into_owned());
    if !field.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(field)
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(invalid)
}
