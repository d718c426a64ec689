use crate::error::{VaultError, VaultResult};
use crate::gateway::progress::{ProgressFn, ProgressReader};
use crate::gateway::{MediaHandle, RemoteMessage, RemoteResponse, Transport};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Blocking HTTP implementation of [`Transport`] against the channel
/// gateway's JSON API, authenticated with a bearer token.
///
/// Holds no connection state between calls; `start`/`disconnect` open and
/// close a remote session per the scoped lifecycle the client enforces.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_token: String,
    download_dir: PathBuf,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_token: &str, download_dir: PathBuf) -> VaultResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            // Transfers are bounded by content length, not wall clock.
            .timeout(None)
            .build()
            .map_err(VaultError::transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            download_dir,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/v1/{suffix}", self.base_url)
    }

    fn checked(resp: Response) -> VaultResult<Response> {
        resp.error_for_status().map_err(VaultError::transport)
    }
}

impl Transport for HttpTransport {
    fn start(&self) -> VaultResult<()> {
        let resp = self
            .client
            .post(self.url("session"))
            .bearer_auth(&self.api_token)
            .send()
            .map_err(VaultError::transport)?;
        Self::checked(resp)?;
        Ok(())
    }

    fn disconnect(&self) -> VaultResult<()> {
        let resp = self
            .client
            .delete(self.url("session"))
            .bearer_auth(&self.api_token)
            .send()
            .map_err(VaultError::transport)?;
        Self::checked(resp)?;
        Ok(())
    }

    fn send_file(
        &self,
        channel_id: i64,
        path: &Path,
        on_progress: Option<ProgressFn>,
    ) -> VaultResult<RemoteMessage> {
        let file = File::open(path)
            .map_err(|_| VaultError::NotFound(format!("local file {}", path.display())))?;
        let total = file
            .metadata()
            .map_err(|err| VaultError::Write {
                path: path.to_path_buf(),
                source: err,
            })?
            .len();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let reader = ProgressReader::new(file, total, on_progress);
        let part = Part::reader_with_length(reader, total).file_name(file_name);
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url(&format!("channels/{channel_id}/files")))
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .map_err(VaultError::transport)?;

        Self::checked(resp)?.json().map_err(VaultError::transport)
    }

    fn fetch_message(&self, channel_id: i64, message_id: i64) -> VaultResult<Option<RemoteMessage>> {
        let resp = self
            .client
            .get(self.url(&format!("channels/{channel_id}/messages/{message_id}")))
            .bearer_auth(&self.api_token)
            .send()
            .map_err(VaultError::transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let message = Self::checked(resp)?.json().map_err(VaultError::transport)?;
        Ok(Some(message))
    }

    fn latest_message(&self, channel_id: i64) -> VaultResult<Option<RemoteMessage>> {
        let resp = self
            .client
            .get(self.url(&format!("channels/{channel_id}/messages")))
            .query(&[("limit", "1")])
            .bearer_auth(&self.api_token)
            .send()
            .map_err(VaultError::transport)?;

        // Newest first; one element at most under limit=1.
        let mut messages: Vec<RemoteMessage> =
            Self::checked(resp)?.json().map_err(VaultError::transport)?;
        if messages.is_empty() {
            return Ok(None);
        }
        Ok(Some(messages.remove(0)))
    }

    fn download_media(&self, media: &MediaHandle) -> VaultResult<PathBuf> {
        let mut resp = Self::checked(
            self.client
                .get(self.url(&format!("media/{}", media.file_id)))
                .bearer_auth(&self.api_token)
                .send()
                .map_err(VaultError::transport)?,
        )?;

        fs::create_dir_all(&self.download_dir).map_err(|err| VaultError::Write {
            path: self.download_dir.clone(),
            source: err,
        })?;

        let name = media
            .file_name
            .clone()
            .unwrap_or_else(|| media.file_id.clone());
        let target = self.download_dir.join(name);

        let mut out = File::create(&target).map_err(|err| VaultError::Write {
            path: target.clone(),
            source: err,
        })?;
        resp.copy_to(&mut out).map_err(VaultError::transport)?;

        Ok(target)
    }

    fn delete_message(&self, channel_id: i64, message_id: i64) -> VaultResult<RemoteResponse> {
        let resp = self
            .client
            .delete(self.url(&format!("channels/{channel_id}/messages/{message_id}")))
            .bearer_auth(&self.api_token)
            .send()
            .map_err(VaultError::transport)?;

        Self::checked(resp)?.json().map_err(VaultError::transport)
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTransport;
    use std::path::PathBuf;

    #[test]
    fn base_url_loses_trailing_slash() {
        let transport = HttpTransport::new(
            "https://gateway.example/",
            "token",
            PathBuf::from("/tmp/downloads"),
        )
        .expect("build transport");

        assert_eq!(
            transport.url("channels/7/messages/42"),
            "https://gateway.example/v1/channels/7/messages/42"
        );
    }
}
