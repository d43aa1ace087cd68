//! Object upload: the operator's file and the client that stores it remotely

use crate::api::types::UploadTarget;
use crate::error::{ImportError, Result};
use crate::import::ports::UploadService;
use pim_common::types::ObjectKey;
use std::path::Path;
use tracing::{info, instrument};

/// Content type assumed when the file does not carry one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/csv";

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// Content type of a spreadsheet the processing service accepts, by extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Some(DEFAULT_CONTENT_TYPE),
        "xlsx" => Some(XLSX_CONTENT_TYPE),
        "xls" => Some(XLS_CONTENT_TYPE),
        _ => None,
    }
}

/// The local file chosen by the operator
#[derive(Clone)]
pub struct SelectedFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl SelectedFile {
    /// Wrap in-memory file contents. An empty content type falls back to `text/csv`.
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        Self {
            name: name.into(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    /// Read a `.csv`, `.xlsx`, or `.xls` file from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let content_type = content_type_for(path)
            .ok_or_else(|| ImportError::UnsupportedFile(path.display().to_string()))?;

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ImportError::UnsupportedFile(path.display().to_string()))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(name, Some(content_type), bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Obtains an upload URL and streams file bytes to it
pub struct ObjectUploadClient<'a, U: ?Sized> {
    service: &'a U,
}

impl<'a, U: UploadService + ?Sized> ObjectUploadClient<'a, U> {
    pub fn new(service: &'a U) -> Self {
        Self { service }
    }

    /// Ask the credential service where `file` may be written.
    #[instrument(skip_all, fields(file = %file.name()))]
    pub async fn request_target(&self, file: &SelectedFile) -> Result<UploadTarget> {
        let target = self
            .service
            .request_upload_target(file.name(), file.content_type())
            .await?;

        if target.upload_url.trim().is_empty() || target.object_key.as_str().trim().is_empty() {
            return Err(ImportError::credential(
                "the service returned an empty upload URL or object key",
            ));
        }

        Ok(target)
    }

    /// Store the file at `target`, returning the key it is now stored under.
    #[instrument(skip_all, fields(file = %file.name(), object_key = %target.object_key))]
    pub async fn upload(&self, target: &UploadTarget, file: SelectedFile) -> Result<ObjectKey> {
        let size = file.len();
        let SelectedFile {
            content_type,
            bytes,
            ..
        } = file;

        self.service.upload(target, bytes, &content_type).await?;

        info!(size, "File stored");
        Ok(target.object_key.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::import::fake::FakeApi;
    use std::io::Write;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/products.CSV")), Some("text/csv"));
        assert_eq!(content_type_for(Path::new("products.xlsx")), Some(XLSX_CONTENT_TYPE));
        assert_eq!(content_type_for(Path::new("products.xls")), Some(XLS_CONTENT_TYPE));
        assert_eq!(content_type_for(Path::new("products.json")), None);
        assert_eq!(content_type_for(Path::new("products")), None);
    }

    #[test]
    fn test_selected_file_defaults_content_type() {
        let file = SelectedFile::new("products.csv", None, b"a,b\n".to_vec());
        assert_eq!(file.content_type(), "text/csv");

        let file = SelectedFile::new("products.csv", Some(""), Vec::new());
        assert_eq!(file.content_type(), "text/csv");
        assert!(file.is_empty());
    }

    #[tokio::test]
    async fn test_from_path_reads_spreadsheet() {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        tmp.write_all(b"ProductSKU,ProductName\nSKU-1,Kettle\n").unwrap();

        let file = SelectedFile::from_path(tmp.path()).await.unwrap();
        assert!(file.name().ends_with(".csv"));
        assert_eq!(file.content_type(), "text/csv");
        assert_eq!(file.len(), 37);
    }

    #[tokio::test]
    async fn test_from_path_rejects_unsupported_extension() {
        let tmp = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let err = SelectedFile::from_path(tmp.path()).await.unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFile(_)));
    }

    #[tokio::test]
    async fn test_upload_returns_target_key() {
        let api = FakeApi::new();
        let client = ObjectUploadClient::new(&api);
        let file = SelectedFile::new("products.csv", None, b"a,b\n".to_vec());

        let target = client.request_target(&file).await.unwrap();
        let key = client.upload(&target, file).await.unwrap();

        assert_eq!(key, target.object_key);
        assert_eq!(api.uploaded_bytes(), vec![b"a,b\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_empty_object_key_is_credential_error() {
        let api = FakeApi::new().with_object_key("");
        let client = ObjectUploadClient::new(&api);
        let file = SelectedFile::new("products.csv", None, Vec::new());

        let err = client.request_target(&file).await.unwrap_err();
        assert!(matches!(err, ImportError::Credential(_)));
    }
}
