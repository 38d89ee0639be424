use serde_json::{json, Value};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub mimetype: Option<String>,
    pub size: Option<u64>,
    pub thumbnail_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaContent {
    pub body: String,
    pub url: Option<String>,
    pub filename: Option<String>,
    pub info: MediaInfo,
}

/// Known message-content variants, produced by a single decode step.
/// Anything the bridge does not understand lands in `Unrecognized` instead
/// of being probed field-by-field at the call sites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageContent {
    Text { body: String },
    Image(MediaContent),
    Video(MediaContent),
    Audio(MediaContent),
    File(MediaContent),
    Unrecognized { msgtype: String, body: Option<String> },
}

impl MessageContent {
    pub fn decode(content: &Value) -> Self {
        let msgtype = content
            .get("msgtype")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let body = content
            .get("body")
            .and_then(Value::as_str)
            .map(str::to_string);
        match msgtype {
            "m.text" | "m.notice" | "m.emote" => MessageContent::Text {
                body: body.unwrap_or_default(),
            },
            "m.image" => MessageContent::Image(decode_media(content, body)),
            "m.video" => MessageContent::Video(decode_media(content, body)),
            "m.audio" => MessageContent::Audio(decode_media(content, body)),
            "m.file" => MessageContent::File(decode_media(content, body)),
            other => MessageContent::Unrecognized {
                msgtype: other.to_string(),
                body,
            },
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            MessageContent::Text { body } => json!({
                "msgtype": "m.text",
                "body": body,
            }),
            MessageContent::Image(media) => encode_media("m.image", media),
            MessageContent::Video(media) => encode_media("m.video", media),
            MessageContent::Audio(media) => encode_media("m.audio", media),
            MessageContent::File(media) => encode_media("m.file", media),
            MessageContent::Unrecognized { msgtype, body } => json!({
                "msgtype": msgtype,
                "body": body.clone().unwrap_or_default(),
            }),
        }
    }

    pub fn media(&self) -> Option<&MediaContent> {
        match self {
            MessageContent::Image(media)
            | MessageContent::Video(media)
            | MessageContent::Audio(media)
            | MessageContent::File(media) => Some(media),
            _ => None,
        }
    }

    /// Textual representation used when media translation degrades.
    pub fn text_body(&self) -> String {
        match self {
            MessageContent::Text { body } => body.clone(),
            MessageContent::Image(media)
            | MessageContent::Video(media)
            | MessageContent::Audio(media)
            | MessageContent::File(media) => media.body.clone(),
            MessageContent::Unrecognized { body, .. } => body.clone().unwrap_or_default(),
        }
    }
}

fn decode_media(content: &Value, body: Option<String>) -> MediaContent {
    let info = content.get("info");
    MediaContent {
        body: body.unwrap_or_default(),
        url: content
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string),
        filename: content
            .get("filename")
            .and_then(Value::as_str)
            .map(str::to_string),
        info: MediaInfo {
            mimetype: info
                .and_then(|i| i.get("mimetype"))
                .and_then(Value::as_str)
                .map(str::to_string),
            size: info.and_then(|i| i.get("size")).and_then(Value::as_u64),
            thumbnail_url: info
                .and_then(|i| i.get("thumbnail_url"))
                .and_then(Value::as_str)
                .map(str::to_string),
        },
    }
}

fn encode_media(msgtype: &str, media: &MediaContent) -> Value {
    let mut info = serde_json::Map::new();
    if let Some(mimetype) = media.info.mimetype.as_ref() {
        info.insert("mimetype".to_string(), json!(mimetype));
    }
    if let Some(size) = media.info.size {
        info.insert("size".to_string(), json!(size));
    }
    if let Some(thumbnail) = media.info.thumbnail_url.as_ref() {
        info.insert("thumbnail_url".to_string(), json!(thumbnail));
    }
    let mut out = serde_json::Map::new();
    out.insert("msgtype".to_string(), json!(msgtype));
    out.insert("body".to_string(), json!(media.body));
    if let Some(url) = media.url.as_ref() {
        out.insert("url".to_string(), json!(url));
    }
    if let Some(filename) = media.filename.as_ref() {
        out.insert("filename".to_string(), json!(filename));
    }
    out.insert("info".to_string(), Value::Object(info));
    Value::Object(out)
}
