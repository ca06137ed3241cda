use std::fmt;

use bytes::Bytes;
use pushline_types::{CompressionType, OrderingToken};
use serde::{Deserialize, Serialize};

use crate::endpoint::{params, paths, ServiceEndpoints, SourceScope};

/// Activity status reported for a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
    Rebuild,
    Refresh,
    Incremental,
    Idle,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rebuild => "REBUILD",
            Self::Refresh => "REFRESH",
            Self::Incremental => "INCREMENTAL",
            Self::Idle => "IDLE",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-once blob destination returned by the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLocation {
    #[serde(rename = "uploadUri")]
    pub upload_uri: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
}

/// Location returned when a stream is opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLocation {
    #[serde(rename = "uploadUri")]
    pub upload_uri: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(rename = "streamId")]
    pub stream_id: String,
}

impl StreamLocation {
    pub fn transfer(&self) -> TransferLocation {
        TransferLocation {
            upload_uri: self.upload_uri.clone(),
            file_id: self.file_id.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Every call the client makes to the Push API, the Platform API, or a
/// transfer location.
#[derive(Clone, Debug)]
pub enum PushRequest {
    UpdateStatus { status: SourceStatus },
    AcquireLocation,
    OpenStream,
    StreamChunk { stream_id: String },
    CloseStream { stream_id: String },
    RegisterBatch { file_id: String },
    RegisterStreamUpdate { file_id: String },
    PutDocument {
        document_id: String,
        ordering: Option<OrderingToken>,
        compression: Option<CompressionType>,
        body: Bytes,
    },
    DeleteDocument {
        document_id: String,
        ordering: Option<OrderingToken>,
        delete_children: bool,
    },
    DeleteOlderThan {
        ordering: OrderingToken,
        queue_delay: Option<u32>,
    },
    PutPermissions {
        provider: String,
        ordering: Option<OrderingToken>,
        body: Bytes,
    },
    PutMappings {
        provider: String,
        ordering: Option<OrderingToken>,
        body: Bytes,
    },
    DeletePermission { provider: String, body: Bytes },
    RegisterPermissionBatch { provider: String, file_id: String },
    DeletePermissionsOlderThan {
        provider: String,
        ordering: OrderingToken,
    },
    PutSecurityProvider { provider: String, body: Bytes },
    Upload { upload_uri: String, body: Bytes },
}

/// A request resolved to its HTTP shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Bytes>,
    /// Blob uploads go to a pre-signed URI: octet-stream body, encryption
    /// header, no bearer token.
    pub upload: bool,
}

impl PushRequest {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::UpdateStatus { .. } => "UpdateStatus",
            Self::AcquireLocation => "AcquireLocation",
            Self::OpenStream => "OpenStream",
            Self::StreamChunk { .. } => "StreamChunk",
            Self::CloseStream { .. } => "CloseStream",
            Self::RegisterBatch { .. } => "RegisterBatch",
            Self::RegisterStreamUpdate { .. } => "RegisterStreamUpdate",
            Self::PutDocument { .. } => "PutDocument",
            Self::DeleteDocument { .. } => "DeleteDocument",
            Self::DeleteOlderThan { .. } => "DeleteOlderThan",
            Self::PutPermissions { .. } => "PutPermissions",
            Self::PutMappings { .. } => "PutMappings",
            Self::DeletePermission { .. } => "DeletePermission",
            Self::RegisterPermissionBatch { .. } => "RegisterPermissionBatch",
            Self::DeletePermissionsOlderThan { .. } => "DeletePermissionsOlderThan",
            Self::PutSecurityProvider { .. } => "PutSecurityProvider",
            Self::Upload { .. } => "Upload",
        }
    }

    /// Resolve the request against concrete endpoints and scope.
    pub fn route(&self, endpoints: &ServiceEndpoints, scope: &SourceScope) -> Route {
        let src = scope.source_id.as_str();
        let org_base = format!("{}/organizations/{}", endpoints.push_api, scope.organization_id);
        let at = |path: String| format!("{org_base}/{path}");

        let mut query: Vec<(&'static str, String)> = Vec::new();
        let ordering_param = |query: &mut Vec<(&'static str, String)>, token: &Option<OrderingToken>| {
            if let Some(token) = token {
                query.push((params::ORDERING_ID, token.to_string()));
            }
        };

        let (method, url, body) = match self {
            Self::UpdateStatus { status } => {
                query.push((params::STATUS_TYPE, status.to_string()));
                (HttpMethod::Post, at(paths::source_status(src)), None)
            }
            Self::AcquireLocation => (HttpMethod::Post, at(paths::FILES.to_string()), None),
            Self::OpenStream => (HttpMethod::Post, at(paths::stream_open(src)), None),
            Self::StreamChunk { stream_id } => {
                (HttpMethod::Post, at(paths::stream_chunk(src, stream_id)), None)
            }
            Self::CloseStream { stream_id } => {
                (HttpMethod::Post, at(paths::stream_close(src, stream_id)), None)
            }
            Self::RegisterBatch { file_id } => {
                query.push((params::FILE_ID, file_id.clone()));
                (HttpMethod::Put, at(paths::documents_batch(src)), None)
            }
            Self::RegisterStreamUpdate { file_id } => {
                query.push((params::FILE_ID, file_id.clone()));
                (HttpMethod::Put, at(paths::stream_update(src)), None)
            }
            Self::PutDocument {
                document_id,
                ordering,
                compression,
                body,
            } => {
                query.push((params::DOCUMENT_ID, document_id.clone()));
                ordering_param(&mut query, ordering);
                if let Some(compression) = compression {
                    query.push((params::COMPRESSION_TYPE, compression.to_string()));
                }
                (HttpMethod::Put, at(paths::documents(src)), Some(body.clone()))
            }
            Self::DeleteDocument {
                document_id,
                ordering,
                delete_children,
            } => {
                query.push((params::DOCUMENT_ID, document_id.clone()));
                ordering_param(&mut query, ordering);
                if *delete_children {
                    query.push((params::DELETE_CHILDREN, "true".into()));
                }
                (HttpMethod::Delete, at(paths::documents(src)), None)
            }
            Self::DeleteOlderThan {
                ordering,
                queue_delay,
            } => {
                query.push((params::ORDERING_ID, ordering.to_string()));
                if let Some(delay) = queue_delay {
                    query.push((params::QUEUE_DELAY, delay.to_string()));
                }
                (HttpMethod::Delete, at(paths::documents_older_than(src)), None)
            }
            Self::PutPermissions {
                provider,
                ordering,
                body,
            } => {
                ordering_param(&mut query, ordering);
                (
                    HttpMethod::Put,
                    at(paths::provider_permissions(provider)),
                    Some(body.clone()),
                )
            }
            Self::PutMappings {
                provider,
                ordering,
                body,
            } => {
                ordering_param(&mut query, ordering);
                (
                    HttpMethod::Put,
                    at(paths::provider_mappings(provider)),
                    Some(body.clone()),
                )
            }
            Self::DeletePermission { provider, body } => (
                HttpMethod::Delete,
                at(paths::provider_permissions(provider)),
                Some(body.clone()),
            ),
            Self::RegisterPermissionBatch { provider, file_id } => {
                query.push((params::FILE_ID, file_id.clone()));
                (
                    HttpMethod::Put,
                    at(paths::provider_permissions_batch(provider)),
                    None,
                )
            }
            Self::DeletePermissionsOlderThan { provider, ordering } => {
                query.push((params::ORDERING_ID, ordering.to_string()));
                (
                    HttpMethod::Delete,
                    at(paths::provider_permissions_older_than(provider)),
                    None,
                )
            }
            Self::PutSecurityProvider { provider, body } => (
                HttpMethod::Put,
                format!(
                    "{}/rest/organizations/{}/{}",
                    endpoints.platform,
                    scope.organization_id,
                    paths::security_provider(provider)
                ),
                Some(body.clone()),
            ),
            Self::Upload { upload_uri, body } => {
                return Route {
                    method: HttpMethod::Put,
                    url: upload_uri.clone(),
                    query,
                    body: Some(body.clone()),
                    upload: true,
                };
            }
        };

        Route {
            method,
            url,
            query,
            body,
            upload: false,
        }
    }

    /// Bytes carried in the request body.
    pub fn body_len(&self) -> usize {
        match self {
            Self::PutDocument { body, .. }
            | Self::PutPermissions { body, .. }
            | Self::PutMappings { body, .. }
            | Self::DeletePermission { body, .. }
            | Self::PutSecurityProvider { body, .. }
            | Self::Upload { body, .. } => body.len(),
            _ => 0,
        }
    }
}
