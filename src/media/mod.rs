//! Media intake for listing attachments. Bounds the set (count and
//! per-file size) at add time, then exchanges local files for durable
//! remote URLs at submission. Uploads are dispatched concurrently but the
//! resulting URL array always preserves attachment order, because index 0
//! is the cover image.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_ATTACHMENTS_PER_LISTING: usize = 3;
pub const MAX_ATTACHMENT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload credential request failed: {0}")]
    Auth(String),
    #[error("image transfer failed: {0}")]
    Transfer(String),
}

/// Short-lived credential for one upload batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UploadAuth {
    pub token: String,
    pub expire: i64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    /// Remote file handle for compensating deletes. `None` for
    /// pre-existing URLs that passed through untouched.
    pub file_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One listing attachment: either an already-durable remote URL (edit
/// mode, untouched images) or a local file awaiting upload.
#[derive(Debug, Clone)]
pub enum Attachment {
    Remote { url: String },
    Local { preview_id: Uuid, file: LocalFile },
}

impl Attachment {
    pub fn remote(url: impl Into<String>) -> Self {
        Attachment::Remote { url: url.into() }
    }

    pub fn local(file: LocalFile) -> Self {
        Attachment::Local {
            preview_id: Uuid::new_v4(),
            file,
        }
    }
}

/// Wire form of an attachment. Local files arrive base64-encoded, the
/// same way document uploads already travel.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AttachmentDto {
    Remote {
        url: String,
    },
    Local {
        file_name: String,
        mime_type: String,
        data: String,
    },
}

impl AttachmentDto {
    pub fn decode(self) -> Result<DecodedAttachment, String> {
        match self {
            AttachmentDto::Remote { url } => Ok(DecodedAttachment::Remote { url }),
            AttachmentDto::Local {
                file_name,
                mime_type,
                data,
            } => {
                let bytes = BASE64
                    .decode(data.as_bytes())
                    .map_err(|_| format!("Invalid base64 data for '{}'", file_name))?;
                Ok(DecodedAttachment::Local(LocalFile {
                    file_name,
                    mime_type,
                    data: bytes,
                }))
            }
        }
    }
}

pub enum DecodedAttachment {
    Remote { url: String },
    Local(LocalFile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    LimitReached,
    TooLarge,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::LimitReached => write!(f, "limit reached"),
            RejectReason::TooLarge => write!(f, "too large"),
        }
    }
}

#[derive(Debug)]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: RejectReason,
}

/// Admit new local files against the per-listing bound. Files beyond the
/// remaining capacity are rejected as over-limit before any size check;
/// files within capacity are then size-filtered independently. Accepted
/// files receive an ephemeral preview id, distinct from the remote URL
/// they eventually resolve to.
pub fn add_files(
    candidates: Vec<LocalFile>,
    current_count: usize,
) -> (Vec<Attachment>, Vec<RejectedFile>) {
    let capacity = MAX_ATTACHMENTS_PER_LISTING.saturating_sub(current_count);

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for (index, file) in candidates.into_iter().enumerate() {
        if index >= capacity {
            rejected.push(RejectedFile {
                file_name: file.file_name,
                reason: RejectReason::LimitReached,
            });
        } else if file.data.len() > MAX_ATTACHMENT_BYTES {
            rejected.push(RejectedFile {
                file_name: file.file_name,
                reason: RejectReason::TooLarge,
            });
        } else {
            accepted.push(Attachment::local(file));
        }
    }

    (accepted, rejected)
}

/// Upload service seam. The production implementation talks to ImageKit;
/// tests substitute an in-memory backend.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// One credential per upload batch.
    async fn authorize(&self) -> Result<UploadAuth, UploadError>;

    async fn upload(
        &self,
        auth: &UploadAuth,
        file: &LocalFile,
    ) -> Result<UploadedImage, UploadError>;

    /// Compensating delete for orphan cleanup. Best-effort.
    async fn delete(&self, file_id: &str) -> Result<(), UploadError>;
}

enum Slot {
    Ready(UploadedImage),
    InFlight(tokio::task::JoinHandle<Result<UploadedImage, UploadError>>),
}

/// Resolve every attachment to a durable URL. Local files upload
/// concurrently under a single batch credential; remote URLs pass through
/// unchanged. The output preserves attachment order regardless of upload
/// completion order. Any failure aborts the whole batch; files already
/// transferred are reported to the caller only through the error path, so
/// cleanup stays the submitter's decision.
pub async fn finalize_uploads(
    backend: Arc<dyn UploadBackend>,
    attachments: Vec<Attachment>,
) -> Result<Vec<UploadedImage>, UploadError> {
    let has_local = attachments
        .iter()
        .any(|a| matches!(a, Attachment::Local { .. }));
    if !has_local {
        return Ok(attachments
            .into_iter()
            .map(|a| match a {
                Attachment::Remote { url } => UploadedImage { url, file_id: None },
                Attachment::Local { .. } => unreachable!(),
            })
            .collect());
    }

    let auth = backend.authorize().await?;

    let mut slots = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        match attachment {
            Attachment::Remote { url } => {
                slots.push(Slot::Ready(UploadedImage { url, file_id: None }));
            }
            Attachment::Local { file, .. } => {
                let backend = Arc::clone(&backend);
                let auth = auth.clone();
                slots.push(Slot::InFlight(tokio::spawn(async move {
                    backend.upload(&auth, &file).await
                })));
            }
        }
    }

    // Awaiting slots in order keeps index 0 the cover image even when a
    // later upload finishes first.
    let mut resolved = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Ready(image) => resolved.push(image),
            Slot::InFlight(handle) => {
                let image = handle
                    .await
                    .map_err(|e| UploadError::Transfer(e.to_string()))??;
                resolved.push(image);
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    fn file(name: &str, len: usize) -> LocalFile {
        LocalFile {
            file_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            data: vec![0u8; len],
        }
    }

    #[test]
    fn intake_fills_remaining_capacity_and_rejects_the_rest() {
        // 2 existing + 5 selected: only 1 slot left.
        let candidates = (0..5).map(|i| file(&format!("img{}.jpg", i), 100)).collect();
        let (accepted, rejected) = add_files(candidates, 2);

        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected.len(), 4);
        assert!(rejected
            .iter()
            .all(|r| r.reason == RejectReason::LimitReached));
    }

    #[test]
    fn one_mebibyte_is_the_inclusive_size_bound() {
        let (accepted, rejected) =
            add_files(vec![file("exact.jpg", MAX_ATTACHMENT_BYTES)], 0);
        assert_eq!(accepted.len(), 1);
        assert!(rejected.is_empty());

        let (accepted, rejected) =
            add_files(vec![file("over.jpg", MAX_ATTACHMENT_BYTES + 1)], 0);
        assert!(accepted.is_empty());
        assert_eq!(rejected[0].reason, RejectReason::TooLarge);
    }

    #[test]
    fn over_limit_files_are_rejected_before_size_filtering() {
        // Capacity 1: the oversized file occupies the slot and is
        // rejected for size; the valid file behind it is over-limit.
        let candidates = vec![
            file("huge.jpg", MAX_ATTACHMENT_BYTES + 1),
            file("ok.jpg", 100),
        ];
        let (accepted, rejected) = add_files(candidates, 2);

        assert!(accepted.is_empty());
        assert_eq!(rejected[0].reason, RejectReason::TooLarge);
        assert_eq!(rejected[1].reason, RejectReason::LimitReached);
    }

    #[test]
    fn accepted_files_get_distinct_preview_handles() {
        let (accepted, _) = add_files(vec![file("a.jpg", 10), file("b.jpg", 10)], 0);
        let ids: Vec<Uuid> = accepted
            .iter()
            .map(|a| match a {
                Attachment::Local { preview_id, .. } => *preview_id,
                Attachment::Remote { .. } => panic!("expected local"),
            })
            .collect();
        assert_ne!(ids[0], ids[1]);
    }

    struct StubBackend {
        delays_ms: HashMap<String, u64>,
        fail_auth: bool,
        fail_file: Option<String>,
        deleted: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new() -> Self {
            StubBackend {
                delays_ms: HashMap::new(),
                fail_auth: false,
                fail_file: None,
                deleted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UploadBackend for StubBackend {
        async fn authorize(&self) -> Result<UploadAuth, UploadError> {
            if self.fail_auth {
                return Err(UploadError::Auth("credential endpoint returned 500".into()));
            }
            Ok(UploadAuth {
                token: "tok".to_string(),
                expire: 0,
                signature: "sig".to_string(),
            })
        }

        async fn upload(
            &self,
            _auth: &UploadAuth,
            file: &LocalFile,
        ) -> Result<UploadedImage, UploadError> {
            if let Some(delay) = self.delays_ms.get(&file.file_name) {
                tokio::time::sleep(Duration::from_millis(*delay)).await;
            }
            if self.fail_file.as_deref() == Some(file.file_name.as_str()) {
                return Err(UploadError::Transfer("connection reset".into()));
            }
            Ok(UploadedImage {
                url: format!("https://cdn.example.com/{}", file.file_name),
                file_id: Some(format!("id-{}", file.file_name)),
            })
        }

        async fn delete(&self, file_id: &str) -> Result<(), UploadError> {
            self.deleted.lock().unwrap().push(file_id.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn finalize_preserves_attachment_order_despite_completion_order() {
        let mut backend = StubBackend::new();
        // First local file finishes long after the second one.
        backend.delays_ms.insert("a.jpg".to_string(), 80);
        backend.delays_ms.insert("c.jpg".to_string(), 5);

        let attachments = vec![
            Attachment::local(file("a.jpg", 10)),
            Attachment::remote("https://cdn.example.com/existing.jpg"),
            Attachment::local(file("c.jpg", 10)),
        ];

        let urls = finalize_uploads(Arc::new(backend), attachments)
            .await
            .unwrap();

        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0].url, "https://cdn.example.com/a.jpg");
        assert_eq!(urls[1].url, "https://cdn.example.com/existing.jpg");
        assert_eq!(urls[1].file_id, None);
        assert_eq!(urls[2].url, "https://cdn.example.com/c.jpg");
    }

    #[tokio::test]
    async fn remote_only_batches_skip_credential_issuance() {
        let mut backend = StubBackend::new();
        backend.fail_auth = true; // would fail if authorize were called

        let attachments = vec![Attachment::remote("https://cdn.example.com/kept.jpg")];
        let urls = finalize_uploads(Arc::new(backend), attachments)
            .await
            .unwrap();
        assert_eq!(urls[0].url, "https://cdn.example.com/kept.jpg");
    }

    #[tokio::test]
    async fn credential_failure_aborts_the_batch() {
        let mut backend = StubBackend::new();
        backend.fail_auth = true;

        let attachments = vec![Attachment::local(file("a.jpg", 10))];
        let err = finalize_uploads(Arc::new(backend), attachments)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Auth(_)));
    }

    #[tokio::test]
    async fn transfer_failure_aborts_the_batch() {
        let mut backend = StubBackend::new();
        backend.fail_file = Some("b.jpg".to_string());

        let attachments = vec![
            Attachment::local(file("a.jpg", 10)),
            Attachment::local(file("b.jpg", 10)),
        ];
        let err = finalize_uploads(Arc::new(backend), attachments)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transfer(_)));
    }

    #[test]
    fn base64_attachments_decode_to_local_files() {
        let dto = AttachmentDto::Local {
            file_name: "photo.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            data: BASE64.encode(b"not-really-a-jpeg"),
        };
        match dto.decode().unwrap() {
            DecodedAttachment::Local(f) => {
                assert_eq!(f.file_name, "photo.jpg");
                assert_eq!(f.data, b"not-really-a-jpeg");
            }
            DecodedAttachment::Remote { .. } => panic!("expected local"),
        }

        let bad = AttachmentDto::Local {
            file_name: "photo.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            data: "!!!".to_string(),
        };
        assert!(bad.decode().is_err());
    }
}
