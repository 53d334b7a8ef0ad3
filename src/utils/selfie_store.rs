use actix_web::web;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use std::path::{Path, PathBuf};
use strum_macros::AsRefStr;
use tracing::debug;
use uuid::Uuid;

use crate::error::AttendanceError;

/// Payloads shorter than this are an empty canvas, not a photo.
pub const MIN_SELFIE_PAYLOAD_LEN: usize = 100;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum SelfieKind {
    #[strum(serialize = "in")]
    CheckIn,
    #[strum(serialize = "out")]
    CheckOut,
}

/// Stores selfie images and hands back opaque references.
#[async_trait]
pub trait SelfieStore: Send + Sync {
    /// `Ok(None)` when the payload carries no image.
    async fn save(&self, payload: &str, kind: SelfieKind) -> Result<Option<String>, AttendanceError>;

    async fn discard(&self, reference: &str) -> Result<(), AttendanceError>;
}

/// Decodes a base64 PNG data URL. Spaces are turned back into `+`, which
/// form encoding tends to eat.
pub fn decode_payload(payload: &str) -> Result<Option<Vec<u8>>, AttendanceError> {
    let payload = payload.trim();
    if payload.len() < MIN_SELFIE_PAYLOAD_LEN {
        return Ok(None);
    }

    let encoded = payload
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .unwrap_or(payload)
        .replace(' ', "+");

    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| AttendanceError::validation(format!("Selfie is not valid base64: {e}")))?;

    Ok((!bytes.is_empty()).then_some(bytes))
}

/// Writes selfies as PNG files under a local upload directory.
pub struct LocalSelfieStore {
    dir: PathBuf,
}

impl LocalSelfieStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, reference: &str) -> Result<PathBuf, AttendanceError> {
        if reference.is_empty() || reference.contains(['/', '\\']) || reference.contains("..") {
            return Err(AttendanceError::validation("Invalid selfie reference"));
        }
        Ok(self.dir.join(reference))
    }
}

#[async_trait]
impl SelfieStore for LocalSelfieStore {
    async fn save(&self, payload: &str, kind: SelfieKind) -> Result<Option<String>, AttendanceError> {
        let Some(bytes) = decode_payload(payload)? else {
            return Ok(None);
        };

        let filename = format!(
            "{}_{}_{}.png",
            kind.as_ref(),
            Utc::now().timestamp(),
            Uuid::new_v4().to_simple()
        );
        let dir = self.dir.clone();
        let path = self.path_of(&filename)?;
        let size = bytes.len();

        web::block(move || {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, bytes)
        })
        .await
        .map_err(|e| AttendanceError::Storage(e.to_string()))??;

        debug!(file = %filename, size, "Selfie stored");
        Ok(Some(filename))
    }

    async fn discard(&self, reference: &str) -> Result<(), AttendanceError> {
        let path = self.path_of(reference)?;

        let removed = web::block(move || match std::fs::remove_file(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        })
        .await
        .map_err(|e| AttendanceError::Storage(e.to_string()))?;

        removed.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_payload(byte: u8) -> String {
        format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(vec![byte; 120]))
    }

    #[test]
    fn test_short_payload_is_no_selfie() {
        assert_eq!(decode_payload("").unwrap(), None);
        assert_eq!(decode_payload("data:,").unwrap(), None);
    }

    #[test]
    fn test_decode_restores_plus_signs() {
        let payload = png_payload(0xfb);
        assert!(payload.contains('+'));

        let mangled = payload.replace('+', " ");
        assert_eq!(decode_payload(&mangled).unwrap(), Some(vec![0xfb; 120]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let garbage = format!("{PNG_DATA_URL_PREFIX}{}", "*".repeat(150));
        assert!(matches!(
            decode_payload(&garbage),
            Err(AttendanceError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn test_save_writes_png_named_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSelfieStore::new(dir.path().join("uploads"));

        let reference = store
            .save(&png_payload(7), SelfieKind::CheckIn)
            .await
            .unwrap()
            .expect("selfie stored");

        assert!(reference.starts_with("in_"));
        assert!(reference.ends_with(".png"));
        let written = std::fs::read(store.dir().join(&reference)).unwrap();
        assert_eq!(written, vec![7; 120]);
    }

    #[actix_web::test]
    async fn test_save_skips_empty_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSelfieStore::new(dir.path());

        let reference = store.save("data:,", SelfieKind::CheckOut).await.unwrap();

        assert_eq!(reference, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn test_discard_removes_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSelfieStore::new(dir.path());

        let reference = store
            .save(&png_payload(1), SelfieKind::CheckOut)
            .await
            .unwrap()
            .unwrap();
        assert!(reference.starts_with("out_"));

        store.discard(&reference).await.unwrap();
        assert!(!dir.path().join(&reference).exists());

        store.discard(&reference).await.unwrap();
    }

    #[actix_web::test]
    async fn test_discard_refuses_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSelfieStore::new(dir.path());

        let err = store.discard("../config.php").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(_)));
    }
}
