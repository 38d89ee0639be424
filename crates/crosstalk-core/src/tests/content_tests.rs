use crate::content::{MediaContent, MediaInfo, MessageContent};
use serde_json::json;

#[test]
fn text_variants_decode_to_text() {
    for msgtype in ["m.text", "m.notice", "m.emote"] {
        let content = MessageContent::decode(&json!({"msgtype": msgtype, "body": "hi"}));
        assert_eq!(
            content,
            MessageContent::Text {
                body: "hi".to_string()
            }
        );
    }
}

#[test]
fn image_decodes_with_info() {
    let content = MessageContent::decode(&json!({
        "msgtype": "m.image",
        "body": "photo.jpg",
        "url": "mxc://srv/m1",
        "info": {"mimetype": "image/jpeg", "size": 2048, "thumbnail_url": "mxc://srv/m2"}
    }));
    let MessageContent::Image(media) = content else {
        panic!("expected image variant");
    };
    assert_eq!(media.url.as_deref(), Some("mxc://srv/m1"));
    assert_eq!(media.info.mimetype.as_deref(), Some("image/jpeg"));
    assert_eq!(media.info.size, Some(2048));
    assert_eq!(media.info.thumbnail_url.as_deref(), Some("mxc://srv/m2"));
}

#[test]
fn unknown_msgtype_is_unrecognized_not_an_error() {
    let content = MessageContent::decode(&json!({"msgtype": "m.location", "body": "here"}));
    assert_eq!(
        content,
        MessageContent::Unrecognized {
            msgtype: "m.location".to_string(),
            body: Some("here".to_string()),
        }
    );
    assert_eq!(content.text_body(), "here");
}

#[test]
fn missing_msgtype_is_unrecognized() {
    let content = MessageContent::decode(&json!({"body": "bare"}));
    assert!(matches!(content, MessageContent::Unrecognized { .. }));
}

#[test]
fn media_encode_decode_round_trip() {
    let original = MessageContent::File(MediaContent {
        body: "report.pdf".to_string(),
        url: Some("mxc://srv/m3".to_string()),
        filename: Some("report.pdf".to_string()),
        info: MediaInfo {
            mimetype: Some("application/pdf".to_string()),
            size: Some(4096),
            thumbnail_url: None,
        },
    });
    let decoded = MessageContent::decode(&original.encode());
    assert_eq!(decoded, original);
}

#[test]
fn text_encode_produces_m_text() {
    let encoded = MessageContent::Text {
        body: "hello".to_string(),
    }
    .encode();
    assert_eq!(encoded["msgtype"], "m.text");
    assert_eq!(encoded["body"], "hello");
}
