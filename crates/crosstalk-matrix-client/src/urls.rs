use crate::error::{MatrixClientError, Result};

pub fn validated_base(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(MatrixClientError::InvalidBaseUrl);
    }
    if trimmed.len() < 8 {
        return Err(MatrixClientError::InvalidBaseUrl);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Percent-encodes a path segment; Matrix ids carry `#`, `!`, `:` and `@`.
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

pub fn send_message(base: &str, room_id: &str, txn_id: &str) -> String {
    format!(
        "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
        base,
        encode_segment(room_id),
        encode_segment(txn_id)
    )
}

pub fn sync(base: &str) -> String {
    format!("{}/_matrix/client/v3/sync", base)
}

pub fn create_room(base: &str) -> String {
    format!("{}/_matrix/client/v3/createRoom", base)
}

pub fn join_room(base: &str, room_id: &str) -> String {
    format!(
        "{}/_matrix/client/v3/join/{}",
        base,
        encode_segment(room_id)
    )
}

pub fn resolve_alias(base: &str, alias: &str) -> String {
    format!(
        "{}/_matrix/client/v3/directory/room/{}",
        base,
        encode_segment(alias)
    )
}

pub fn room_aliases(base: &str, room_id: &str) -> String {
    format!(
        "{}/_matrix/client/v3/rooms/{}/aliases",
        base,
        encode_segment(room_id)
    )
}

pub fn upload(base: &str) -> String {
    format!("{}/_matrix/media/v3/upload", base)
}

pub fn pushers_set(base: &str) -> String {
    format!("{}/_matrix/client/v3/pushers/set", base)
}

pub fn media_download(base: &str, server: &str, media_id: &str) -> String {
    format!(
        "{}/_matrix/media/v3/download/{}/{}",
        base,
        encode_segment(server),
        encode_segment(media_id)
    )
}
