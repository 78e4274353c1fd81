//! Process-wide broker configuration, fixed at startup.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_BACKUP_PATH: &str = "backup.json";
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BACKLOG: u32 = 1024;
pub const DEFAULT_READ_IDLE_TIMEOUT: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Location of the JSON snapshot.
    pub backup_path: PathBuf,
    /// A lease at least this old is reclaimed by the next request.
    pub task_timeout: Duration,
    /// Pending-connection backlog of the listener.
    pub backlog: u32,
    /// A read that stays idle this long ends the request.
    pub read_idle_timeout: Duration,
    pub max_request_bytes: usize,
    pub remove_backup_on_exit: bool,
}

impl BrokerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backup_path: PathBuf::from(DEFAULT_BACKUP_PATH),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            backlog: DEFAULT_BACKLOG,
            read_idle_timeout: DEFAULT_READ_IDLE_TIMEOUT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            remove_backup_on_exit: false,
        }
    }
}
