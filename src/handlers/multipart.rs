use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::middleware::guard::{FieldSource, Presence};
use crate::services::media::StagedFile;

/// A parsed multipart body: text fields plus files staged to disk
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    /// Read every part. Parts with a file name (or one of `file_fields`) are
    /// staged under `temp_dir`; the rest are read as text.
    pub async fn parse(mut multipart: Multipart, temp_dir: &Path, file_fields: &[&str]) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            if file_name.is_some() || file_fields.contains(&name.as_str()) {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                if bytes.is_empty() {
                    continue;
                }
                let staged = StagedFile::stage(temp_dir, &bytes, file_name, content_type).await?;
                form.files.insert(name, staged);
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {}", e)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Trimmed text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.trim())
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

impl FieldSource for MultipartForm {
    fn presence(&self, name: &str) -> Presence {
        if self.files.contains_key(name) {
            return Presence::Present;
        }
        self.fields.presence(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::guard::{required, Schema};

    #[tokio::test]
    async fn files_and_fields_both_satisfy_the_guard() {
        const UPLOAD: Schema = Schema::new(&[
            required("title", "Title is required"),
            required("videoFile", "Video is required"),
        ]);

        let dir = tempfile::tempdir().unwrap();
        let mut form = MultipartForm::default();
        form.fields.insert("title".into(), "Intro".into());
        assert_eq!(UPLOAD.check(&form).unwrap_err().message(), "Video is required");

        let staged = StagedFile::stage(dir.path(), b"data", Some("v.mp4".into()), None)
            .await
            .unwrap();
        form.files.insert("videoFile".into(), staged);
        assert!(UPLOAD.check(&form).is_ok());
        assert!(form.take_file("videoFile").is_some());
        assert!(form.take_file("videoFile").is_none());
    }
}
