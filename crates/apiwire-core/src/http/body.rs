//! Request body representations

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::Result;

/// Content type used for raw bytes, streams and file parts
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Content type used for plain-text bodies
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// Content type used for JSON bodies
pub const APPLICATION_JSON: &str = "application/json";
/// Content type used for XML bodies
pub const APPLICATION_XML: &str = "application/xml";
/// Content type used for url-encoded forms
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// File content sent as a stream body or a multipart file part.
///
/// The content is held in memory behind an `Arc` so a request can be
/// resent by the retry loop without re-reading the source.
#[derive(Clone, PartialEq, Eq)]
pub struct FileStream {
    data: Arc<[u8]>,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl FileStream {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::from(data.into()),
            file_name: None,
            content_type: None,
        }
    }

    /// Load a file from disk, keeping its file name for multipart parts
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self {
            data: Arc::from(data),
            file_name,
            content_type: None,
        })
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStream")
            .field("len", &self.data.len())
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Content of a single multipart part
#[derive(Debug, Clone, PartialEq)]
pub enum PartContent {
    Text(String),
    File(FileStream),
}

/// One named part of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartPart {
    pub name: String,
    pub content: PartContent,
    pub content_type: Option<String>,
}

/// Outbound request body
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Scalar sent as text
    Text(String),
    /// Serialized JSON document
    Json(String),
    /// Serialized XML document
    Xml(String),
    Bytes(Vec<u8>),
    Stream(FileStream),
    /// Url-encoded form pairs, already flattened
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartPart>),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Textual form of the body, when it has one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Text(text) | RequestBody::Json(text) | RequestBody::Xml(text) => Some(text),
            _ => None,
        }
    }

    /// Body bytes for transports that send a single buffer.
    ///
    /// Multipart bodies have no single-buffer form and return `None`.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            RequestBody::Empty => Some(Vec::new()),
            RequestBody::Text(text) | RequestBody::Json(text) | RequestBody::Xml(text) => {
                Some(text.as_bytes().to_vec())
            }
            RequestBody::Bytes(bytes) => Some(bytes.clone()),
            RequestBody::Stream(stream) => Some(stream.data().to_vec()),
            RequestBody::Form(pairs) => Some(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter())
                    .finish()
                    .into_bytes(),
            ),
            RequestBody::Multipart(_) => None,
        }
    }
}
