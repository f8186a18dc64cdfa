//! Announcement codec
//!
//! Qaku clients publish JSON envelopes of the form
//!
//! ```json
//! {
//!   "type": "persist",
//!   "payload": { "cid": "zDv...", "owner": "0xabc", "hash": "..." },
//!   "timestamp": 1700000000,
//!   "signature": "...",
//!   "signer": "..."
//! }
//! ```
//!
//! The `type` tag selects the payload shape. Only `persist` exists today;
//! new kinds are added as variants of [`AnnouncementKind`] so every consumer
//! has to handle them explicitly.

use serde::Deserialize;
use std::fmt;

use crate::error::DecodeError;

/// Payloads larger than this are rejected before parsing.
pub const MAX_ANNOUNCEMENT_BYTES: usize = 64 * 1024;

/// Opaque content identifier of a dataset in the storage network.
///
/// Never empty; surrounding whitespace is stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    /// Validate and wrap a content identifier.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DecodeError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DecodeError::MissingContentId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request to keep a dataset replicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRequest {
    /// Dataset to replicate.
    pub cid: ContentId,
    /// Identity of the publisher. Informational only.
    pub owner: String,
    /// Integrity hash supplied by the publisher. Not checked.
    pub hash: String,
}

/// What an announcement asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementKind {
    /// Replicate the referenced dataset.
    Persist(ReplicationRequest),
}

impl AnnouncementKind {
    /// Wire tag of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Persist(_) => "persist",
        }
    }
}

/// A decoded announcement envelope.
///
/// `signature` and `signer` are carried through for logging; nothing
/// verifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub kind: AnnouncementKind,
    /// Unix timestamp set by the publisher, if any.
    pub timestamp: Option<i64>,
    pub signature: Option<String>,
    pub signer: Option<String>,
}

impl Announcement {
    /// Content identifier the announcement refers to.
    pub fn content_id(&self) -> &ContentId {
        match &self.kind {
            AnnouncementKind::Persist(request) => &request.cid,
        }
    }

    /// Consume the envelope, keeping the replication request.
    pub fn into_request(self) -> ReplicationRequest {
        match self.kind {
            AnnouncementKind::Persist(request) => request,
        }
    }
}

/// Tags accepted in the `type` field.
const KNOWN_KINDS: &[&str] = &["persist"];

#[derive(Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
enum WireKind {
    Persist(WirePersist),
}

#[derive(Deserialize)]
struct WirePersist {
    #[serde(default)]
    cid: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    hash: String,
}

#[derive(Deserialize)]
struct WireMeta {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    signer: Option<String>,
}

/// Decode a raw bus payload into an [`Announcement`].
///
/// Fails when the payload is oversized, is not a JSON object, carries an
/// unknown `type`, or names no content identifier.
pub fn decode(bytes: &[u8]) -> Result<Announcement, DecodeError> {
    if bytes.len() > MAX_ANNOUNCEMENT_BYTES {
        return Err(DecodeError::TooLarge {
            size: bytes.len(),
            max: MAX_ANNOUNCEMENT_BYTES,
        });
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let tag = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("expected a JSON object".to_string()))?
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| DecodeError::Malformed("missing `type` tag".to_string()))?;

    if !KNOWN_KINDS.contains(&tag) {
        return Err(DecodeError::UnknownKind(tag.to_string()));
    }

    let kind = WireKind::deserialize(&value).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let meta = WireMeta::deserialize(&value).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let kind = match kind {
        WireKind::Persist(payload) => AnnouncementKind::Persist(ReplicationRequest {
            cid: ContentId::parse(&payload.cid)?,
            owner: payload.owner,
            hash: payload.hash,
        }),
    };

    Ok(Announcement {
        kind,
        timestamp: meta.timestamp,
        signature: meta.signature,
        signer: meta.signer,
    })
}
