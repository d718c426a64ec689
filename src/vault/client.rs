use crate::error::{VaultError, VaultResult};
use crate::gateway::{ProgressFn, RemoteMessage, RemoteResponse, Transport};
use crate::vault::ledger::Ledger;
use std::path::{Path, PathBuf};

/// Orchestrates the four primary operations against a transport, recording
/// upload and delete effects in the ledger after the remote effect commits.
///
/// Each operation brackets its transport work with `start`/`disconnect`, so
/// the session lives exactly as long as one logical operation. The remote
/// effect always precedes the ledger effect; a failed send never produces a
/// ledger entry, while a failed ledger write after a successful remote call
/// leaves the remote ahead of the log (accepted drift, surfaced to the
/// caller).
pub struct StorageClient<T: Transport> {
    transport: T,
    channel_id: i64,
    ledger: Ledger,
}

impl<T: Transport> StorageClient<T> {
    pub fn new(transport: T, channel_id: i64, ledger: Ledger) -> Self {
        Self {
            transport,
            channel_id,
            ledger,
        }
    }

    /// Upload `path` as a channel attachment and record it in the ledger.
    pub fn upload(
        &self,
        path: &Path,
        on_progress: Option<ProgressFn>,
    ) -> VaultResult<RemoteMessage> {
        if !path.exists() {
            return Err(VaultError::NotFound(format!(
                "local file {}",
                path.display()
            )));
        }

        self.transport.start()?;
        let sent = self.transport.send_file(self.channel_id, path, on_progress);
        let closed = self.transport.disconnect();

        let message = sent?;
        self.ledger.record_upload(message.id, path)?;
        closed?;
        Ok(message)
    }

    /// Fetch the message's attachment into the download directory. `None`
    /// when the message exists but carries no media; the ledger is never
    /// touched (downloads do not change remote storage state).
    pub fn download(&self, message_id: i64) -> VaultResult<Option<PathBuf>> {
        self.transport.start()?;
        let fetched = self.fetch_media(message_id);
        let closed = self.transport.disconnect();

        let local_path = fetched?;
        closed?;
        Ok(local_path)
    }

    fn fetch_media(&self, message_id: i64) -> VaultResult<Option<PathBuf>> {
        let message = self
            .transport
            .fetch_message(self.channel_id, message_id)?
            .ok_or_else(|| VaultError::NotFound(format!("message {message_id}")))?;

        let Some(media) = message.media else {
            return Ok(None);
        };
        Ok(Some(self.transport.download_media(&media)?))
    }

    /// Delete the remote message and record the deletion locally. The ledger
    /// call happens unconditionally; it no-ops on ids it never saw.
    pub fn delete(&self, message_id: i64) -> VaultResult<RemoteResponse> {
        self.transport.start()?;
        let deleted = self.transport.delete_message(self.channel_id, message_id);
        let closed = self.transport.disconnect();

        let response = deleted?;
        self.ledger.record_deletion(message_id)?;
        closed?;
        Ok(response)
    }

    /// Id of the newest message on the channel, `None` when it is empty.
    pub fn latest_message_id(&self) -> VaultResult<Option<i64>> {
        self.transport.start()?;
        let latest = self.transport.latest_message(self.channel_id);
        let closed = self.transport.disconnect();

        let message = latest?;
        closed?;
        Ok(message.map(|m| m.id))
    }
}
