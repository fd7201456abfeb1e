//! On-disk areas for uploaded originals and translated outputs.
//!
//! ```text
//! {root}/original/{job_id}.pdf
//! {root}/output/{job_id}.pdf
//! ```

use crate::error::TranslateError;
use crate::job::JobId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JobStorage {
    root: PathBuf,
}

impl JobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn original_path(&self, id: &JobId) -> PathBuf {
        self.root.join("original").join(format!("{id}.pdf"))
    }

    pub fn output_path(&self, id: &JobId) -> PathBuf {
        self.root.join("output").join(format!("{id}.pdf"))
    }

    /// Store the uploaded document.
    pub async fn save_original(&self, id: &JobId, bytes: &[u8]) -> Result<PathBuf, TranslateError> {
        let path = self.original_path(id);
        write_atomic(&path, bytes).await?;
        debug!("Job {}: stored {} byte upload at {}", id, bytes.len(), path.display());
        Ok(path)
    }

    /// Store a translated document. The file appears complete or not at all.
    pub async fn write_output(&self, id: &JobId, bytes: &[u8]) -> Result<PathBuf, TranslateError> {
        let path = self.output_path(id);
        write_atomic(&path, bytes).await?;
        debug!("Job {}: wrote {} byte output to {}", id, bytes.len(), path.display());
        Ok(path)
    }

    /// Publish the untouched original as the job's output.
    pub async fn copy_original_to_output(&self, id: &JobId) -> Result<PathBuf, TranslateError> {
        let original = self.original_path(id);
        let bytes = tokio::fs::read(&original).await.map_err(|e| storage_err(&original, e))?;
        self.write_output(id, &bytes).await
    }

    /// Remove a job's output if present.
    pub async fn discard_output(&self, id: &JobId) -> Result<(), TranslateError> {
        let path = self.output_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(&path, e)),
        }
    }

    /// Bytes of the translated document, `OutputNotFound` if there is none.
    pub async fn read_output(&self, id: &JobId) -> Result<Vec<u8>, TranslateError> {
        let path = self.output_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TranslateError::OutputNotFound { id: id.to_string() })
            }
            Err(e) => Err(storage_err(&path, e)),
        }
    }
}

fn storage_err(path: &Path, source: std::io::Error) -> TranslateError {
    TranslateError::Storage {
        path: path.to_path_buf(),
        source,
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TranslateError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_err(path, e))?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| storage_err(path, e))?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| storage_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_storage_layout() {
        let storage = JobStorage::new("/srv/data");
        let id = JobId::new();
        assert_eq!(
            storage.original_path(&id),
            PathBuf::from(format!("/srv/data/original/{id}.pdf"))
        );
        assert_eq!(
            storage.output_path(&id),
            PathBuf::from(format!("/srv/data/output/{id}.pdf"))
        );
    }

    #[tokio::test]
    async fn missing_output_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JobStorage::new(dir.path());
        let err = storage.read_output(&JobId::new()).await.unwrap_err();
        assert!(matches!(err, TranslateError::OutputNotFound { .. }));
    }

    #[tokio::test]
    async fn original_copy_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JobStorage::new(dir.path());
        let id = JobId::new();
        let bytes = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\nbody".to_vec();

        storage.save_original(&id, &bytes).await.unwrap();
        storage.copy_original_to_output(&id).await.unwrap();

        assert_eq!(storage.read_output(&id).await.unwrap(), bytes);
        assert!(!storage.output_path(&id).with_extension("pdf.tmp").exists());
    }
}
