//! Reply encoding and decoding.
//!
//! Domain outcomes (`NONE`, `YES`, `NO`) and failures (`ERR <reason>`) use
//! separate tokens, so a client never mistakes a rejected request for an empty
//! queue.

use crate::domain::{LeasedTask, TaskId};

use super::CommandKind;

const NONE: &[u8] = b"NONE";
const YES: &[u8] = b"YES";
const NO: &[u8] = b"NO";
const ERR: &[u8] = b"ERR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// ADD: id of the new task.
    Added(TaskId),
    /// GET: the leased task.
    Task(LeasedTask),
    /// GET: nothing available.
    NoTask,
    Yes,
    No,
    /// The request was rejected or could not be made durable.
    Error(String),
}

impl Reply {
    pub fn from_bool(value: bool) -> Self {
        if value { Reply::Yes } else { Reply::No }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Added(id) => id.as_str().as_bytes().to_vec(),
            Reply::Task(task) => {
                let mut out = format!("{} {} ", task.id, task.length).into_bytes();
                out.extend_from_slice(&task.payload);
                out
            }
            Reply::NoTask => NONE.to_vec(),
            Reply::Yes => YES.to_vec(),
            Reply::No => NO.to_vec(),
            Reply::Error(message) => {
                let mut out = ERR.to_vec();
                out.push(b' ');
                out.extend_from_slice(message.as_bytes());
                out
            }
        }
    }

    /// Decode the reply to a request of the given kind.
    ///
    /// Returns `Err` with a description when the bytes do not fit the kind.
    pub fn decode(kind: CommandKind, bytes: &[u8]) -> Result<Self, String> {
        let bytes = bytes.trim_ascii();
        if bytes == ERR {
            return Ok(Reply::Error(String::new()));
        }
        if let Some(message) = bytes.strip_prefix(b"ERR ") {
            return Ok(Reply::Error(String::from_utf8_lossy(message).into_owned()));
        }

        let malformed = || format!("{kind}: {}", String::from_utf8_lossy(bytes));
        match kind {
            CommandKind::Add => {
                if bytes.is_empty() || bytes.iter().any(u8::is_ascii_whitespace) {
                    return Err(malformed());
                }
                let id = std::str::from_utf8(bytes).map_err(|_| malformed())?;
                Ok(Reply::Added(TaskId::new(id)))
            }
            CommandKind::Get if bytes == NONE => Ok(Reply::NoTask),
            CommandKind::Get => {
                let mut fields = bytes.splitn(3, |b| *b == b' ');
                let (Some(id), Some(length), Some(payload)) =
                    (fields.next(), fields.next(), fields.next())
                else {
                    return Err(malformed());
                };
                let id = std::str::from_utf8(id).map_err(|_| malformed())?;
                let length = std::str::from_utf8(length)
                    .ok()
                    .and_then(|digits| digits.parse().ok())
                    .ok_or_else(malformed)?;
                Ok(Reply::Task(LeasedTask {
                    id: TaskId::new(id),
                    length,
                    payload: payload.to_vec(),
                }))
            }
            CommandKind::Ack | CommandKind::In if bytes == YES => Ok(Reply::Yes),
            CommandKind::Ack | CommandKind::In if bytes == NO => Ok(Reply::No),
            CommandKind::Ack | CommandKind::In => Err(malformed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn task() -> LeasedTask {
        LeasedTask {
            id: TaskId::new("x1"),
            length: 5,
            payload: b"hello".to_vec(),
        }
    }

    #[rstest]
    #[case::added(Reply::Added(TaskId::new("abc")), b"abc".as_slice())]
    #[case::task(Reply::Task(task()), b"x1 5 hello".as_slice())]
    #[case::none(Reply::NoTask, b"NONE".as_slice())]
    #[case::yes(Reply::Yes, b"YES".as_slice())]
    #[case::no(Reply::No, b"NO".as_slice())]
    #[case::error(Reply::Error("unknown command: put".into()), b"ERR unknown command: put".as_slice())]
    fn encodes(#[case] reply: Reply, #[case] expected: &[u8]) {
        assert_eq!(reply.encode(), expected);
    }

    #[test]
    fn decodes_leased_task() {
        assert_eq!(
            Reply::decode(CommandKind::Get, b"x1 5 hello"),
            Ok(Reply::Task(task()))
        );
        assert_eq!(Reply::decode(CommandKind::Get, b"NONE"), Ok(Reply::NoTask));
    }

    #[test]
    fn error_is_recognized_for_every_kind() {
        for kind in [CommandKind::Add, CommandKind::Get, CommandKind::Ack, CommandKind::In] {
            assert_eq!(
                Reply::decode(kind, b"ERR empty request"),
                Ok(Reply::Error("empty request".into()))
            );
        }
    }

    #[test]
    fn rejects_replies_that_do_not_fit_the_command() {
        assert!(Reply::decode(CommandKind::Ack, b"NONE").is_err());
        assert!(Reply::decode(CommandKind::Get, b"YES").is_err());
        assert!(Reply::decode(CommandKind::Add, b"").is_err());
    }
}
