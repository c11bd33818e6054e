//! Voice attachment hosting.
//!
//! Voice clips are not sent inline: the audio is uploaded to the EFChat
//! object store first and the message carries only the returned reference.
//! Upload failures are surfaced to the caller — a message must never
//! reference a resource that was not actually hosted.

use serde_json::Value;
use tracing::debug;

use efchat_model::{Voice, VoicePayload};

use crate::error::UploadError;

/// Fixed upload endpoint of the EFChat object store.
pub const UPLOAD_URL: &str = "https://efchat.melon.fish/upload";

/// Uploads voice payloads and resolves them to wire references.
pub struct VoiceUploader {
    client: reqwest::Client,
    upload_url: String,
}

impl VoiceUploader {
    /// Creates an uploader against the default endpoint.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: UPLOAD_URL.to_string(),
        }
    }

    /// Creates an uploader against a custom endpoint.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: url.into(),
        }
    }

    /// Uploads raw audio bytes and returns the server-assigned reference.
    pub async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, UploadError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("upfile", part)
            .text("cmd", "chat");

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let src = parse_upload_response(&body)?;
        debug!(%src, "voice clip hosted");
        Ok(src)
    }

    /// Resolves a voice to its hosted reference, uploading if needed.
    ///
    /// Already-resolved voices are returned unchanged; pending payloads
    /// are read (file, URL fetch, or raw bytes) and uploaded.
    pub async fn resolve(&self, voice: &Voice) -> Result<Voice, UploadError> {
        let payload = match voice {
            Voice::Resolved { .. } => return Ok(voice.clone()),
            Voice::Pending(payload) => payload,
        };

        let (bytes, file_name) = self.read_payload(payload).await?;
        let src = self.upload(bytes, &file_name).await?;
        Ok(Voice::resolved(src))
    }

    async fn read_payload(&self, payload: &VoicePayload) -> Result<(Vec<u8>, String), UploadError> {
        match payload {
            VoicePayload::Raw(bytes) => Ok((bytes.clone(), "voice.mp3".to_string())),
            VoicePayload::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| UploadError::Payload(e.to_string()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "voice.mp3".to_string());
                Ok((bytes, name))
            }
            VoicePayload::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| UploadError::Payload(e.to_string()))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Payload(e.to_string()))?;
                let name = url
                    .rsplit('/')
                    .next()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("voice.mp3")
                    .to_string();
                Ok((bytes.to_vec(), name))
            }
        }
    }
}

impl Default for VoiceUploader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the `src` reference from an upload response body.
fn parse_upload_response(body: &Value) -> Result<String, UploadError> {
    body.get("src")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(UploadError::MissingReference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_upload_response() {
        let body = json!({"src": "USERSENDVOICE_abc.mp3"});
        assert_eq!(
            parse_upload_response(&body).unwrap(),
            "USERSENDVOICE_abc.mp3"
        );
    }

    #[test]
    fn test_parse_upload_response_missing_src() {
        assert!(matches!(
            parse_upload_response(&json!({"ok": true})),
            Err(UploadError::MissingReference)
        ));
        assert!(matches!(
            parse_upload_response(&json!({"src": 42})),
            Err(UploadError::MissingReference)
        ));
    }

    #[tokio::test]
    async fn test_resolve_keeps_resolved_voice() {
        let uploader = VoiceUploader::new();
        let voice = Voice::resolved("clip.mp3");
        let resolved = uploader.resolve(&voice).await.unwrap();
        assert_eq!(resolved, voice);
    }
}
