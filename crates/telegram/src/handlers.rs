//! Mapping from raw teloxide updates to [`InboundEvent`]s.
//!
//! Everything here is pure: the polling loop feeds `Message`s in, the router
//! consumes the resulting events. Media extraction knows about every kind the
//! bot can download and fills in sensible names for kinds Telegram leaves
//! nameless (photos, voice notes, stickers).

use teloxide::types::Message;

use crate::{router::InboundEvent, transport::MediaDescriptor};

/// Reduce one incoming message to the fields the router classifies on.
#[must_use]
pub fn inbound_event(msg: &Message) -> InboundEvent {
    InboundEvent {
        chat: msg.chat.id,
        has_sender: msg.from.is_some(),
        text: extract_text(msg),
        media: media_descriptor(msg),
        reply_to: msg.reply_to_message().map(|reply| reply.id.0),
    }
}

/// Message text, falling back to the media caption.
fn extract_text(msg: &Message) -> Option<String> {
    msg.text().or(msg.caption()).map(ToOwned::to_owned)
}

/// Downloadable media carried by a message, if any. Photos come as a list of
/// sizes and the largest one wins.
pub(crate) fn media_descriptor(msg: &Message) -> Option<MediaDescriptor> {
    if let Some(document) = msg.document() {
        return Some(MediaDescriptor {
            file_id: document.file.id.clone(),
            file_name: document.file_name.clone(),
            mime_type: document.mime_type.as_ref().map(ToString::to_string),
        });
    }
    if let Some(sizes) = msg.photo() {
        let largest = sizes.last()?;
        return Some(MediaDescriptor {
            file_id: largest.file.id.clone(),
            file_name: Some("photo.jpg".to_string()),
            mime_type: Some("image/jpeg".to_string()),
        });
    }
    if let Some(video) = msg.video() {
        return Some(MediaDescriptor {
            file_id: video.file.id.clone(),
            file_name: Some(video.file_name.clone().unwrap_or_else(|| "video.mp4".to_string())),
            mime_type: Some(
                video.mime_type.as_ref().map_or_else(|| "video/mp4".to_string(), ToString::to_string),
            ),
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(MediaDescriptor {
            file_id: animation.file.id.clone(),
            file_name: Some(
                animation.file_name.clone().unwrap_or_else(|| "animation.mp4".to_string()),
            ),
            mime_type: Some(
                animation
                    .mime_type
                    .as_ref()
                    .map_or_else(|| "video/mp4".to_string(), ToString::to_string),
            ),
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(MediaDescriptor {
            file_id: audio.file.id.clone(),
            file_name: Some(audio.file_name.clone().unwrap_or_else(|| "audio.mp3".to_string())),
            mime_type: Some(
                audio.mime_type.as_ref().map_or_else(|| "audio/mpeg".to_string(), ToString::to_string),
            ),
        });
    }
    if let Some(voice) = msg.voice() {
        return Some(MediaDescriptor {
            file_id: voice.file.id.clone(),
            file_name: Some("voice.ogg".to_string()),
            mime_type: Some(
                voice.mime_type.as_ref().map_or_else(|| "audio/ogg".to_string(), ToString::to_string),
            ),
        });
    }
    if let Some(sticker) = msg.sticker() {
        return Some(MediaDescriptor {
            file_id: sticker.file.id.clone(),
            file_name: Some("sticker.webp".to_string()),
            mime_type: Some("image/webp".to_string()),
        });
    }
    None
}

// ── tests ───────────────────────────────────────────────────────────────────
