use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use md5::Md5;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::canonical::CanonicalJson;
use crate::error::{ValidationError, ValidationResult};
use crate::permission::{PermissionIdentity, PermissionLevel, PermissionSet};
use crate::reserved::is_reserved_key;
use crate::validate::{is_base64, validate_document_id};

const PERMANENT_ID_KEY: &str = "permanentid";

/// Derive the 60-character permanent id of a document.
///
/// First 30 hex characters of the MD5 digest followed by the first 30 hex
/// characters of the SHA-1 digest of the UTF-8 document id.
pub fn permanent_id(document_id: &str) -> String {
    let bytes = document_id.as_bytes();
    let md5 = hex::encode(Md5::digest(bytes));
    let sha1 = hex::encode(Sha1::digest(bytes));
    format!("{}{}", &md5[..30], &sha1[..30])
}

/// How a compressed payload was compressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompressionType {
    Uncompressed,
    Deflate,
    Gzip,
    Lzma,
    Zlib,
}

impl CompressionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uncompressed => "UNCOMPRESSED",
            Self::Deflate => "DEFLATE",
            Self::Gzip => "GZIP",
            Self::Lzma => "LZMA",
            Self::Zlib => "ZLIB",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document to add or update.
///
/// Only `document_id` is mandatory. Empty fields are left out of the
/// serialized form; metadata entries are flattened next to the structural
/// fields under their lower-cased key.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "DocumentId")]
    document_id: String,
    #[serde(rename = "permanentid", skip_serializing_if = "String::is_empty")]
    permanent_id: String,
    #[serde(rename = "Title", skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "ClickableUri", skip_serializing_if = "String::is_empty")]
    pub clickable_uri: String,
    #[serde(rename = "Data", skip_serializing_if = "String::is_empty")]
    data: String,
    #[serde(rename = "CompressedBinaryData", skip_serializing_if = "String::is_empty")]
    compressed_binary_data: String,
    #[serde(
        rename = "CompressedBinaryDataFileId",
        skip_serializing_if = "String::is_empty"
    )]
    compressed_binary_data_file_id: String,
    #[serde(rename = "CompressionType", skip_serializing_if = "Option::is_none")]
    compression_type: Option<CompressionType>,
    #[serde(rename = "Date", skip_serializing_if = "String::is_empty")]
    date: String,
    #[serde(rename = "ModifiedDate", skip_serializing_if = "String::is_empty")]
    modified_date: String,
    #[serde(rename = "FileExtension", skip_serializing_if = "String::is_empty")]
    pub file_extension: String,
    #[serde(rename = "ParentId", skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    #[serde(rename = "Author", skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(rename = "Permissions", skip_serializing_if = "Vec::is_empty")]
    permissions: Vec<PermissionLevel>,
    #[serde(flatten)]
    metadata: BTreeMap<String, Value>,
}

impl Document {
    /// Create a document for the given id (a URL). The permanent id is
    /// derived immediately; the id itself is checked by [`Self::validate`].
    pub fn new(document_id: impl Into<String>) -> Self {
        let document_id = document_id.into();
        let permanent_id = permanent_id(&document_id);
        Self {
            document_id,
            permanent_id,
            title: String::new(),
            clickable_uri: String::new(),
            data: String::new(),
            compressed_binary_data: String::new(),
            compressed_binary_data_file_id: String::new(),
            compression_type: None,
            date: String::new(),
            modified_date: String::new(),
            file_extension: String::new(),
            parent_id: String::new(),
            author: String::new(),
            permissions: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// The derived permanent id, or the metadata value that replaced it.
    pub fn permanent_id(&self) -> &str {
        self.metadata
            .get(PERMANENT_ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or(&self.permanent_id)
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn compressed_binary_data(&self) -> &str {
        &self.compressed_binary_data
    }

    pub fn compressed_binary_data_file_id(&self) -> &str {
        &self.compressed_binary_data_file_id
    }

    pub fn compression_type(&self) -> Option<CompressionType> {
        self.compression_type
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn modified_date(&self) -> &str {
        &self.modified_date
    }

    pub fn permissions(&self) -> &[PermissionLevel] {
        &self.permissions
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Bytes of inline payload (plain data plus compressed data).
    pub fn inline_payload_len(&self) -> usize {
        self.data.len() + self.compressed_binary_data.len()
    }

    /// Plain-text body of the document.
    pub fn set_data(&mut self, data: impl Into<String>) -> ValidationResult<()> {
        let data = data.into();
        if data.is_empty() {
            return Err(ValidationError::EmptyValue { field: "Data" });
        }
        self.data = data;
        Ok(())
    }

    pub fn set_date<Tz: TimeZone>(&mut self, date: &DateTime<Tz>)
    where
        Tz::Offset: fmt::Display,
    {
        self.date = date.to_rfc3339();
    }

    /// Parse an RFC 3339 timestamp and store it as the document date.
    pub fn set_date_str(&mut self, date: &str) -> ValidationResult<()> {
        self.date = parse_date(date)?;
        Ok(())
    }

    pub fn set_modified_date<Tz: TimeZone>(&mut self, date: &DateTime<Tz>)
    where
        Tz::Offset: fmt::Display,
    {
        self.modified_date = date.to_rfc3339();
    }

    pub fn set_modified_date_str(&mut self, date: &str) -> ValidationResult<()> {
        self.modified_date = parse_date(date)?;
        Ok(())
    }

    /// Set an already compressed, base64 encoded body.
    pub fn set_compressed_encoded_data(
        &mut self,
        encoded: impl Into<String>,
        compression: CompressionType,
    ) -> ValidationResult<()> {
        let encoded = encoded.into();
        if encoded.is_empty() {
            return Err(ValidationError::EmptyValue {
                field: "CompressedBinaryData",
            });
        }
        if !is_base64(&encoded) {
            return Err(ValidationError::InvalidBase64 {
                field: "CompressedBinaryData",
            });
        }
        self.compressed_binary_data = encoded;
        self.compressed_binary_data_file_id.clear();
        self.compression_type = Some(compression);
        Ok(())
    }

    /// Zlib-compress `content` at best compression and store it base64
    /// encoded.
    pub fn set_content_and_zlib_compress(&mut self, content: &str) -> ValidationResult<()> {
        if content.is_empty() {
            return Err(ValidationError::EmptyValue {
                field: "CompressedBinaryData",
            });
        }
        // Writing into a Vec cannot fail.
        let compressed = zlib_compress(content.as_bytes()).unwrap_or_default();
        self.compressed_binary_data = STANDARD.encode(compressed);
        self.compressed_binary_data_file_id.clear();
        self.compression_type = Some(CompressionType::Zlib);
        Ok(())
    }

    /// Read a file, zlib-compress and base64 encode it, and take its
    /// extension (with the leading dot) as the file extension.
    pub fn compress_file(&mut self, path: &Path) -> io::Result<()> {
        debug!(path = %path.display(), "compressing file");
        let content = std::fs::read(path)?;
        let compressed = zlib_compress(&content)?;
        self.file_extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        self.compressed_binary_data = STANDARD.encode(compressed);
        self.compressed_binary_data_file_id.clear();
        self.compression_type = Some(CompressionType::Zlib);
        Ok(())
    }

    /// Point the body at a previously uploaded file, dropping any inline
    /// payload.
    pub fn set_compressed_data_file_id(&mut self, file_id: impl Into<String>) -> ValidationResult<()> {
        let file_id = file_id.into();
        if file_id.is_empty() {
            return Err(ValidationError::EmptyValue {
                field: "CompressedBinaryDataFileId",
            });
        }
        self.compressed_binary_data.clear();
        self.data.clear();
        self.compressed_binary_data_file_id = file_id;
        Ok(())
    }

    /// Replace the compression type, e.g. after moving a plain-text body to
    /// a transfer location.
    pub fn set_compression_type(&mut self, compression: CompressionType) {
        self.compression_type = Some(compression);
    }

    /// Attach a metadata value.
    ///
    /// Reserved keys are rejected regardless of case. Empty strings and
    /// nulls are skipped with a warning. A `permanentid` entry replaces the
    /// derived permanent id.
    pub fn add_metadata(&mut self, key: &str, value: impl Into<Value>) -> ValidationResult<()> {
        if key.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        if is_reserved_key(key) {
            return Err(ValidationError::ReservedKey(key.to_string()));
        }
        let value = value.into();
        if value.is_null() || value.as_str().is_some_and(str::is_empty) {
            warn!(key, document_id = %self.document_id, "metadata value not set, skipping");
            return Ok(());
        }
        let key = key.to_lowercase();
        if key == PERMANENT_ID_KEY {
            debug!(document_id = %self.document_id, "permanent id replaced by metadata");
            self.permanent_id.clear();
        }
        self.metadata.insert(key, value);
        Ok(())
    }

    /// Append a single level holding one permission set.
    pub fn set_allowed_and_denied_permissions(
        &mut self,
        allowed: Vec<PermissionIdentity>,
        denied: Vec<PermissionIdentity>,
        allow_anonymous: bool,
    ) {
        let mut set = PermissionSet::new("Set1");
        set.add_allowed(allowed);
        set.add_denied(denied);
        set.allow_anonymous = allow_anonymous;

        let mut level = PermissionLevel::new("Level1");
        level.add_permission_set(set);
        self.permissions.push(level);
    }

    pub fn add_permission_level(&mut self, level: PermissionLevel) {
        self.permissions.push(level);
    }

    /// Check every rule a document must satisfy before it is buffered or
    /// sent.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_document_id(&self.document_id)?;
        if !self.data.is_empty() && !self.compressed_binary_data.is_empty() {
            return Err(ValidationError::ConflictingPayloads(self.document_id.clone()));
        }
        Ok(())
    }

    /// The document as a JSON value.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl CanonicalJson for Document {}

fn parse_date(value: &str) -> ValidationResult<String> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.to_rfc3339())
        .map_err(|e| ValidationError::InvalidDate {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn zlib_compress(content: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(content)?;
    encoder.finish()
}

/// Marker for a document to remove.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentToDelete {
    #[serde(rename = "DocumentId")]
    pub document_id: String,
    #[serde(rename = "deleteChildren", default)]
    pub delete_children: bool,
}

impl DocumentToDelete {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            delete_children: false,
        }
    }

    pub fn with_children(mut self) -> Self {
        self.delete_children = true;
        self
    }
}

impl CanonicalJson for DocumentToDelete {}

/// Operation applied by a partial update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartialUpdateOperator {
    ArrayAppend,
    ArrayRemove,
    FieldValueReplace,
    DictionaryPut,
    DictionaryRemove,
}

/// Patch to one field of an already indexed document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialUpdate {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub operator: PartialUpdateOperator,
    pub field: String,
    pub value: Value,
}

impl PartialUpdate {
    pub fn new(
        document_id: impl Into<String>,
        operator: PartialUpdateOperator,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            operator,
            field: field.into(),
            value: value.into(),
        }
    }
}

impl CanonicalJson for PartialUpdate {}
