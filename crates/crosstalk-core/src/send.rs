use crate::content::{MediaContent, MediaInfo, MessageContent};
use crate::error::BridgeError;
use crate::mapping::MappingStore;
use crate::matrix::MatrixClient;
use crate::rooms::DirectRoomManager;
use async_trait::async_trait;
use crosstalk_api::types::{Attachment, FileEnvelope, FILE_TRANSFER_CONTENT_TYPE};
use log::{debug, warn};
use std::sync::Arc;

/// Bounded byte download from a source URL. The raw transport is an
/// external utility; the engine only sees this seam.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>, BridgeError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Text,
    Media,
    TextFallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendOutcome {
    pub event_id: String,
    pub delivery: Delivery,
}

pub struct SendEngine {
    client: Arc<dyn MatrixClient>,
    mappings: Arc<MappingStore>,
    rooms: Arc<DirectRoomManager>,
    fetcher: Arc<dyn ContentFetcher>,
    max_attachment_bytes: usize,
}

impl SendEngine {
    pub fn new(
        client: Arc<dyn MatrixClient>,
        mappings: Arc<MappingStore>,
        rooms: Arc<DirectRoomManager>,
        fetcher: Arc<dyn ContentFetcher>,
        max_attachment_bytes: usize,
    ) -> Self {
        Self {
            client,
            mappings,
            rooms,
            fetcher,
            max_attachment_bytes,
        }
    }

    pub async fn send(
        &self,
        from: &str,
        to: &str,
        body: &str,
        content_type: &str,
    ) -> Result<SendOutcome, BridgeError> {
        let sender = self
            .mappings
            .resolve(from)
            .await
            .ok_or_else(|| BridgeError::UnknownSender(from.to_string()))?;
        let room_id = if to.starts_with('!') {
            to.to_string()
        } else {
            let recipient = self
                .mappings
                .resolve(to)
                .await
                .ok_or_else(|| BridgeError::UnknownRecipient(to.to_string()))?;
            self.rooms.ensure_room(&sender, &recipient).await?
        };
        // Covers prior join attempts that partially failed; best effort.
        if let Err(err) = self.client.join_room(&sender, &room_id).await {
            debug!("membership re-assert in {} failed: {}", room_id, err);
        }
        let (content, delivery) = if content_type == FILE_TRANSFER_CONTENT_TYPE {
            self.build_media(&sender, body).await
        } else {
            (
                MessageContent::Text {
                    body: body.to_string(),
                },
                Delivery::Text,
            )
        };
        let event_id = self
            .client
            .send_message(&sender, &room_id, &content)
            .await
            .map_err(BridgeError::from)?;
        Ok(SendOutcome { event_id, delivery })
    }

    async fn build_media(&self, sender: &str, raw_body: &str) -> (MessageContent, Delivery) {
        let envelope: FileEnvelope = match serde_json::from_str(raw_body) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("unparseable file envelope, sending as text: {}", err);
                return (
                    MessageContent::Text {
                        body: raw_body.to_string(),
                    },
                    Delivery::TextFallback,
                );
            }
        };
        // The external protocol carries at most one attachment per message.
        let Some(attachment) = envelope.attachments.first() else {
            return (
                MessageContent::Text {
                    body: envelope.body,
                },
                Delivery::Text,
            );
        };
        match self.upload_attachment(sender, &envelope, attachment).await {
            Ok(content) => (content, Delivery::Media),
            Err(err) => {
                warn!("attachment delivery degraded to text: {}", err);
                (
                    MessageContent::Text {
                        body: envelope.body.clone(),
                    },
                    Delivery::TextFallback,
                )
            }
        }
    }

    async fn upload_attachment(
        &self,
        sender: &str,
        envelope: &FileEnvelope,
        attachment: &Attachment,
    ) -> Result<MessageContent, BridgeError> {
        let bytes = self
            .fetcher
            .fetch(&attachment.url, self.max_attachment_bytes)
            .await?;
        let size = bytes.len() as u64;
        let content_type =
            effective_content_type(attachment.content_type.as_deref().unwrap_or(""), &bytes);
        let uri = self
            .client
            .upload_media(sender, &content_type, bytes)
            .await
            .map_err(BridgeError::from)?;
        let thumbnail_url = match attachment.thumbnail_url.as_deref() {
            Some(url) => self.upload_thumbnail(sender, url).await,
            None => None,
        };
        let media = MediaContent {
            body: attachment
                .filename
                .clone()
                .unwrap_or_else(|| envelope.body.clone()),
            url: Some(uri),
            filename: attachment.filename.clone(),
            info: MediaInfo {
                mimetype: Some(content_type.clone()),
                size: Some(size),
                thumbnail_url,
            },
        };
        Ok(match content_type.split('/').next().unwrap_or_default() {
            "image" => MessageContent::Image(media),
            "video" => MessageContent::Video(media),
            "audio" => MessageContent::Audio(media),
            _ => MessageContent::File(media),
        })
    }

    async fn upload_thumbnail(&self, sender: &str, url: &str) -> Option<String> {
        let bytes = match self.fetcher.fetch(url, self.max_attachment_bytes).await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("thumbnail download skipped: {}", err);
                return None;
            }
        };
        let content_type = effective_content_type("", &bytes);
        match self.client.upload_media(sender, &content_type, bytes).await {
            Ok(uri) => Some(uri),
            Err(err) => {
                debug!("thumbnail upload skipped: {}", err);
                None
            }
        }
    }
}

/// Corrects a missing or generic declared type with a magic-byte sniff.
pub fn effective_content_type(declared: &str, bytes: &[u8]) -> String {
    let declared = declared.trim();
    if !declared.is_empty() && declared != "application/octet-stream" {
        return declared.to_string();
    }
    sniff_content_type(bytes)
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF8") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    if bytes.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if bytes.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    None
}
