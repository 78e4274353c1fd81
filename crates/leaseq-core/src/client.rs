//! Client for the broker protocol.
//!
//! Each call opens a new connection, sends one request, half-closes the
//! write side and reads the reply until the broker closes the connection.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::domain::{ClientError, LeasedTask, QueueName, TaskId};
use crate::protocol::{Command, Reply};

#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Send raw request bytes and return the raw reply.
    pub async fn send_raw(&self, request: &[u8]) -> Result<Vec<u8>, ClientError> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(request).await?;
        stream.shutdown().await?;

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;
        Ok(reply)
    }

    /// Send a command and decode the reply. `ERR` replies become
    /// `ClientError::Rejected`.
    pub async fn execute(&self, command: &Command) -> Result<Reply, ClientError> {
        let bytes = self.send_raw(&command.to_bytes()).await?;
        match Reply::decode(command.kind(), &bytes).map_err(ClientError::MalformedReply)? {
            Reply::Error(message) => Err(ClientError::Rejected(message)),
            reply => Ok(reply),
        }
    }

    pub async fn add(
        &self,
        queue: &str,
        length: u64,
        payload: &[u8],
    ) -> Result<TaskId, ClientError> {
        check_token("queue", queue.as_bytes())?;
        check_token("payload", payload)?;
        let command = Command::Add {
            queue: QueueName::new(queue),
            length,
            payload: payload.to_vec(),
        };
        match self.execute(&command).await? {
            Reply::Added(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    /// Lease the next task of `queue`, if any.
    pub async fn get(&self, queue: &str) -> Result<Option<LeasedTask>, ClientError> {
        check_token("queue", queue.as_bytes())?;
        let command = Command::Get {
            queue: QueueName::new(queue),
        };
        match self.execute(&command).await? {
            Reply::Task(task) => Ok(Some(task)),
            Reply::NoTask => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    pub async fn ack(&self, queue: &str, id: &TaskId) -> Result<bool, ClientError> {
        check_token("queue", queue.as_bytes())?;
        check_token("task id", id.as_str().as_bytes())?;
        let command = Command::Ack {
            queue: QueueName::new(queue),
            id: id.clone(),
        };
        self.yes_no(&command).await
    }

    /// `IN`: does the task still exist in `queue`?
    pub async fn contains(&self, queue: &str, id: &TaskId) -> Result<bool, ClientError> {
        check_token("queue", queue.as_bytes())?;
        check_token("task id", id.as_str().as_bytes())?;
        let command = Command::In {
            queue: QueueName::new(queue),
            id: id.clone(),
        };
        self.yes_no(&command).await
    }

    async fn yes_no(&self, command: &Command) -> Result<bool, ClientError> {
        match self.execute(command).await? {
            Reply::Yes => Ok(true),
            Reply::No => Ok(false),
            other => Err(unexpected(other)),
        }
    }
}

fn check_token(name: &str, value: &[u8]) -> Result<(), ClientError> {
    if value.is_empty() || value.iter().any(u8::is_ascii_whitespace) {
        return Err(ClientError::InvalidArgument(format!(
            "{name} must be a non-empty token without whitespace"
        )));
    }
    Ok(())
}

fn unexpected(reply: Reply) -> ClientError {
    ClientError::MalformedReply(format!("unexpected reply {reply:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_whitespace_in_payload_before_connecting() {
        let client = Client::new("127.0.0.1:1");
        let err = client.add("q", 1, b"two words").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejects_empty_queue_name() {
        let client = Client::new("127.0.0.1:1");
        assert!(matches!(
            client.get("").await,
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn rejects_task_id_with_whitespace() {
        let client = Client::new("127.0.0.1:1");
        let id = TaskId::new("abc def");
        assert!(matches!(
            client.ack("q", &id).await,
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.contains("q", &id).await,
            Err(ClientError::InvalidArgument(_))
        ));
    }
}
