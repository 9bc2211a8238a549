//! Endpoint-level request description.
//!
//! # Design
//! An `EndpointRequest` names a path relative to the client's base URL and
//! says which parameters go in the query, which in the form body and which
//! files are attached. It is assembled through `EndpointRequestBuilder` and
//! has no setters afterwards, so what gets sent is exactly what was built.
//! File contents are read when the attachment is created; a missing file
//! fails there, before any network activity.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

/// A single request against the REST API, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    files: Vec<FileAttachment>,
    multipart: bool,
}

impl EndpointRequest {
    pub fn get(path: &str) -> EndpointRequestBuilder {
        EndpointRequestBuilder::new(HttpMethod::Get, path)
    }

    pub fn post(path: &str) -> EndpointRequestBuilder {
        EndpointRequestBuilder::new(HttpMethod::Post, path)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    /// True when the body has to be encoded as `multipart/form-data`:
    /// requested through `multipart()` or implied by an attached file.
    pub fn is_multipart(&self) -> bool {
        self.multipart
    }
}

/// Consuming builder for `EndpointRequest`.
#[derive(Debug, Clone)]
pub struct EndpointRequestBuilder {
    inner: EndpointRequest,
}

impl EndpointRequestBuilder {
    fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            inner: EndpointRequest {
                method,
                path: path.to_string(),
                query: Vec::new(),
                form: Vec::new(),
                files: Vec::new(),
                multipart: false,
            },
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.inner.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn queries<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a (&'a str, &'a str)>,
    {
        self.inner
            .query
            .extend(pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.inner.form.push((key.to_string(), value.to_string()));
        self
    }

    pub fn fields<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a (&'a str, &'a str)>,
    {
        self.inner
            .form
            .extend(pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    /// Encode the body as `multipart/form-data` even without files.
    pub fn multipart(mut self) -> Self {
        self.inner.multipart = true;
        self
    }

    pub fn file(mut self, attachment: FileAttachment) -> Self {
        self.inner.files.push(attachment);
        self.multipart()
    }

    pub fn files<I>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = FileAttachment>,
    {
        self.inner.files.extend(attachments);
        self.multipart()
    }

    pub fn build(self) -> EndpointRequest {
        self.inner
    }
}

/// A file to upload as one part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    field: String,
    file_name: String,
    content_type: String,
    content: Vec<u8>,
}

impl FileAttachment {
    /// Read `path` into an attachment sent under `field`.
    ///
    /// Surrounding quotes and spaces are stripped from the path, which is how
    /// paths often arrive when copied out of server responses. The base name
    /// becomes the part's file name.
    pub fn from_path(field: &str, path: impl AsRef<Path>) -> Result<Self> {
        let raw = path.as_ref().to_string_lossy();
        let path = PathBuf::from(raw.trim_matches(|c| c == '"' || c == ' '));

        let content = fs::read(&path).map_err(|source| ApiError::File {
            path: path.clone(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            field: field.to_string(),
            content_type: guess_content_type(&file_name).to_string(),
            file_name,
            content,
        })
    }

    pub fn from_bytes(field: &str, file_name: &str, content: Vec<u8>) -> Self {
        Self {
            field: field.to_string(),
            file_name: file_name.to_string(),
            content_type: guess_content_type(file_name).to_string(),
            content,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Content type from the file extension; only the media formats the API
/// accepts are recognised.
fn guess_content_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_parameter_order() {
        let req = EndpointRequest::post("/story/user_stories")
            .field("sessionid", "abc")
            .fields(&[("user_id", "25025320"), ("amount", "1")])
            .build();
        assert_eq!(req.method(), HttpMethod::Post);
        assert_eq!(req.path(), "/story/user_stories");
        let keys: Vec<&str> = req.form().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["sessionid", "user_id", "amount"]);
        assert!(req.query().is_empty());
        assert!(!req.is_multipart());
    }

    #[test]
    fn multipart_flag_does_not_need_files() {
        let req = EndpointRequest::post("/photo/upload_to_story")
            .multipart()
            .field("sessionid", "abc")
            .build();
        assert!(req.is_multipart());
        assert!(req.files().is_empty());
    }

    #[test]
    fn get_builder_collects_query() {
        let req = EndpointRequest::get("/media/pk_from_code")
            .queries(&[("code", "B1LbfVPlwIA")])
            .build();
        assert_eq!(req.method(), HttpMethod::Get);
        assert_eq!(req.query(), [("code".to_string(), "B1LbfVPlwIA".to_string())]);
    }

    #[test]
    fn from_path_reads_file_and_keeps_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.JPG");
        fs::write(&path, b"\xff\xd8\xffjpeg").unwrap();

        let att = FileAttachment::from_path("files", &path).unwrap();
        assert_eq!(att.field(), "files");
        assert_eq!(att.file_name(), "photo.JPG");
        assert_eq!(att.content_type(), "image/jpeg");
        assert_eq!(att.content(), b"\xff\xd8\xffjpeg");
    }

    #[test]
    fn from_path_strips_quotes_and_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"mp4").unwrap();

        let quoted = format!(" \"{}\" ", path.display());
        let att = FileAttachment::from_path("file", quoted).unwrap();
        assert_eq!(att.file_name(), "clip.mp4");
        assert_eq!(att.content_type(), "video/mp4");
    }

    #[test]
    fn from_path_missing_file_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jpg");

        let err = FileAttachment::from_path("file", &path).unwrap_err();
        match err {
            ApiError::File { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected File error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let att = FileAttachment::from_bytes("file", "blob.bin", vec![1, 2, 3]);
        assert_eq!(att.content_type(), "application/octet-stream");
        let att = att.with_content_type("image/png");
        assert_eq!(att.content_type(), "image/png");
    }
}
