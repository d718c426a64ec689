pub mod http;
pub mod progress;

use crate::error::VaultResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use progress::ProgressFn;

/// One sent or fetched channel item, as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: i64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub media: Option<MediaHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaHandle {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub ok: bool,
    #[serde(default)]
    pub deleted_count: u32,
}

/// Remote channel capabilities the storage client depends on.
///
/// The session is scoped per logical operation: callers bracket each
/// operation with `start`/`disconnect`; implementations must not assume a
/// long-lived connection across calls.
pub trait Transport {
    fn start(&self) -> VaultResult<()>;
    fn disconnect(&self) -> VaultResult<()>;

    fn send_file(
        &self,
        channel_id: i64,
        path: &Path,
        on_progress: Option<ProgressFn>,
    ) -> VaultResult<RemoteMessage>;

    fn fetch_message(&self, channel_id: i64, message_id: i64) -> VaultResult<Option<RemoteMessage>>;

    fn latest_message(&self, channel_id: i64) -> VaultResult<Option<RemoteMessage>>;

    fn download_media(&self, media: &MediaHandle) -> VaultResult<PathBuf>;

    fn delete_message(&self, channel_id: i64, message_id: i64) -> VaultResult<RemoteResponse>;
}
