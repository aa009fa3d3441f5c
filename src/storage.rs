//! Uploaded spreadsheets on local disk.

use actix_web::web;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
}

impl UploadStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored name for an upload: `<uuid>_<sanitized original name>`.
    pub fn stored_name(original_filename: &str) -> String {
        format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename::sanitize(original_filename)
        )
    }

    /// Write `data` under the upload directory and return the full path.
    pub async fn save(&self, original_filename: &str, data: Vec<u8>) -> std::io::Result<PathBuf> {
        let dir = self.dir.clone();
        let file_path = dir.join(Self::stored_name(original_filename));
        let target = file_path.clone();

        web::block(move || -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            let mut f = fs::File::create(&target)?;
            f.write_all(&data)
        })
        .await
        .map_err(std::io::Error::other)??;

        log::debug!("stored upload {}", file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_is_sanitized_and_unique() {
        let a = UploadStorage::stored_name("../../etc/interns.csv");
        let b = UploadStorage::stored_name("../../etc/interns.csv");
        assert_ne!(a, b);
        assert!(!a.contains('/'));
        assert!(a.ends_with("interns.csv"));
    }

    #[actix_web::test]
    async fn test_save_writes_into_upload_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = UploadStorage::new(tmp.path().join("uploads"));

        let path = storage
            .save("june batch.csv", b"student_name\n".to_vec())
            .await
            .unwrap();

        assert!(path.starts_with(storage.dir()));
        assert_eq!(fs::read(&path).unwrap(), b"student_name\n");
    }
}
