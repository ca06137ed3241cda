use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use pushline_batch::{BatchAccumulator, PermissionBatch, PushMode, SessionSummary, StreamSession};
use pushline_protocol::{PushCodec, PushRequest, SourceStatus};
use pushline_transport::{
    HttpTransport, MemoryTransport, PushTransport, RetryingTransport, StatusNotifier,
    TransferChannel,
};
use pushline_types::validate::validate_queue_delay;
use pushline_types::{
    CompressionType, ConfigError, Document, DocumentToDelete, IdentityExpansion, OrderingClock,
    OrderingToken, PartialUpdate, PermissionIdentityBody, SecurityProvider,
    SecurityProviderReference, ValidationError, WallClock, COMPRESSED_DATA_MAX_SIZE,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PushConfig;
use crate::error::SdkResult;

/// Entry point for applications pushing into one source.
///
/// Single-item calls go straight to the service. Batch and stream work is
/// handed out as [`BatchAccumulator`], [`StreamSession`], and
/// [`PermissionBatch`] values that share this client's transport and clock.
pub struct PushClient {
    config: PushConfig,
    transport: Arc<dyn PushTransport>,
    clock: Arc<dyn OrderingClock>,
    notifier: StatusNotifier,
    channel: TransferChannel,
}

impl PushClient {
    /// Client over HTTPS, with retries when the configuration enables them.
    /// A spool-only configuration without an API key gets an offline
    /// transport.
    pub fn connect(config: PushConfig) -> SdkResult<Self> {
        config.validate()?;
        let transport: Arc<dyn PushTransport> = match &config.api_key {
            Some(_) => {
                let http = HttpTransport::new(config.http_settings()?)?;
                if config.retry.is_enabled() {
                    Arc::new(RetryingTransport::new(http, config.retry.clone()))
                } else {
                    Arc::new(http)
                }
            }
            None => {
                info!("no API key configured, running offline");
                Arc::new(MemoryTransport::with_scope(config.scope()))
            }
        };
        info!(
            organization = %config.organization_id,
            source = %config.source_id,
            environment = %config.environment,
            mode = %config.mode,
            "push client ready"
        );
        Self::with_transport(config, transport, Arc::new(WallClock))
    }

    pub fn with_transport(
        config: PushConfig,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
    ) -> SdkResult<Self> {
        config.batch_config().validate()?;
        Ok(Self {
            notifier: StatusNotifier::new(transport.clone()),
            channel: TransferChannel::new(transport.clone()),
            config,
            transport,
            clock,
        })
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn PushTransport> {
        self.transport.clone()
    }

    pub fn mint_token(&self) -> OrderingToken {
        self.clock.mint()
    }

    // ---- Sessions ----

    /// Accumulator for the configured mode.
    pub fn batch(&self) -> SdkResult<BatchAccumulator> {
        Ok(BatchAccumulator::new(
            &self.config.batch_config(),
            self.transport.clone(),
            self.clock.clone(),
        )?)
    }

    /// Stream session for the configured stream mode. With a spool
    /// configured the session writes to disk, like [`Self::batch`].
    pub fn stream(&self) -> SdkResult<StreamSession> {
        let ceiling = self.config.max_request_size;
        if let Some(spool) = &self.config.spool {
            if self.config.mode != PushMode::PlainBatch {
                return Ok(StreamSession::spooled(
                    spool.clone(),
                    self.transport.clone(),
                    self.clock.clone(),
                    ceiling,
                ));
            }
        }
        match self.config.mode {
            PushMode::OpenStream => Ok(StreamSession::open_stream(
                self.transport.clone(),
                self.clock.clone(),
                ceiling,
            )),
            PushMode::UpdateStream => Ok(StreamSession::update_stream(
                self.transport.clone(),
                self.clock.clone(),
                ceiling,
            )),
            PushMode::PlainBatch => Err(ConfigError::InvalidModeCombination {
                operation: "stream session",
                mode: self.config.mode.to_string(),
            }
            .into()),
        }
    }

    pub fn permission_batch(&self, provider: impl Into<String>) -> PermissionBatch {
        PermissionBatch::new(
            provider,
            self.transport.clone(),
            self.clock.clone(),
            self.config.max_request_size,
        )
    }

    /// Push a complete set of items in one call.
    pub async fn add_documents(
        &self,
        adds: Vec<Document>,
        deletes: Vec<DocumentToDelete>,
        patches: Vec<PartialUpdate>,
        update_status: bool,
        delete_older: bool,
    ) -> SdkResult<SessionSummary> {
        let mut batch = self.batch()?;
        Ok(batch
            .submit(adds, deletes, patches, update_status, delete_older)
            .await?)
    }

    // ---- Single-item operations ----

    pub async fn update_source_status(&self, status: SourceStatus) -> SdkResult<()> {
        self.notifier.notify(status).await?;
        Ok(())
    }

    /// Validate and PUT one document.
    ///
    /// An inline payload above the single-call limit is uploaded to a
    /// transfer location first and replaced by its file id.
    pub async fn add_single_document(
        &self,
        mut document: Document,
        update_status: bool,
        ordering: Option<OrderingToken>,
    ) -> SdkResult<()> {
        document.validate()?;
        info!(document_id = document.document_id(), "adding single document");
        if update_status {
            self.notifier.notify(SourceStatus::Rebuild).await?;
        }

        self.offload_large_payload(&mut document).await?;
        let compression = if document.compressed_binary_data().is_empty()
            && document.compressed_binary_data_file_id().is_empty()
        {
            None
        } else {
            document.compression_type()
        };
        let body = PushCodec::encode_json(&document)?;
        self.transport
            .execute(&PushRequest::PutDocument {
                document_id: document.document_id().to_string(),
                ordering,
                compression,
                body,
            })
            .await?;

        if update_status {
            self.notifier.notify(SourceStatus::Idle).await?;
        }
        Ok(())
    }

    async fn offload_large_payload(&self, document: &mut Document) -> SdkResult<()> {
        let size = document.inline_payload_len();
        debug!(document_id = document.document_id(), size, "inline payload size");
        if size <= COMPRESSED_DATA_MAX_SIZE {
            return Ok(());
        }

        let plain = !document.data().is_empty();
        let payload = if plain {
            Bytes::from(document.data().as_bytes().to_vec())
        } else {
            let decoded = STANDARD
                .decode(document.compressed_binary_data())
                .map_err(|_| ValidationError::InvalidBase64 {
                    field: "CompressedBinaryData",
                })?;
            Bytes::from(decoded)
        };
        let file_id = self.channel.acquire_and_upload(payload).await?;
        info!(document_id = document.document_id(), size, %file_id, "payload moved to transfer location");
        document.set_compressed_data_file_id(file_id)?;
        if plain {
            document.set_compression_type(CompressionType::Uncompressed);
        }
        Ok(())
    }

    /// Delete one document. Only available in plain-batch mode.
    pub async fn remove_single_document(
        &self,
        document_id: &str,
        update_status: bool,
        ordering: Option<OrderingToken>,
        delete_children: bool,
    ) -> SdkResult<()> {
        if self.config.mode != PushMode::PlainBatch {
            return Err(ConfigError::InvalidModeCombination {
                operation: "single document delete",
                mode: self.config.mode.to_string(),
            }
            .into());
        }
        pushline_types::validate::validate_document_id(document_id)?;
        info!(document_id, delete_children, "removing single document");
        if update_status {
            self.notifier.notify(SourceStatus::Rebuild).await?;
        }
        self.transport
            .execute(&PushRequest::DeleteDocument {
                document_id: document_id.to_string(),
                ordering,
                delete_children,
            })
            .await?;
        if update_status {
            self.notifier.notify(SourceStatus::Idle).await?;
        }
        Ok(())
    }

    /// Delete every document whose ordering token is below `ordering`.
    pub async fn delete_older_than(
        &self,
        ordering: OrderingToken,
        queue_delay: Option<i64>,
    ) -> SdkResult<()> {
        let queue_delay = queue_delay.map(validate_queue_delay).transpose()?;
        info!(%ordering, ?queue_delay, "deleting older documents");
        self.transport
            .execute(&PushRequest::DeleteOlderThan {
                ordering,
                queue_delay,
            })
            .await?;
        Ok(())
    }

    // ---- Permissions ----

    /// Create or replace a security provider referenced by this source.
    pub async fn add_security_provider(
        &self,
        provider_id: &str,
        kind: &str,
        cascading_to: BTreeMap<String, Value>,
    ) -> SdkResult<()> {
        let provider = SecurityProvider {
            name: provider_id.to_string(),
            node_required: false,
            kind: kind.to_string(),
            referenced_by: vec![SecurityProviderReference::source(&self.config.source_id)],
            cascading_security_providers: cascading_to,
        };
        info!(provider = provider_id, kind, "registering security provider");
        self.transport
            .execute(&PushRequest::PutSecurityProvider {
                provider: provider_id.to_string(),
                body: PushCodec::encode_json(&provider)?,
            })
            .await?;
        Ok(())
    }

    /// PUT one expansion. Bodies with mappings go to the mappings endpoint.
    pub async fn add_permission_expansion(
        &self,
        provider: &str,
        body: PermissionIdentityBody,
        ordering: Option<OrderingToken>,
    ) -> SdkResult<()> {
        let encoded = PushCodec::encode_json(&body)?;
        let request = if body.mappings.is_empty() {
            PushRequest::PutPermissions {
                provider: provider.to_string(),
                ordering,
                body: encoded,
            }
        } else {
            PushRequest::PutMappings {
                provider: provider.to_string(),
                ordering,
                body: encoded,
            }
        };
        debug!(provider, request = request.type_name(), identity = %body.identity.name, "permission expansion");
        self.transport.execute(&request).await?;
        Ok(())
    }

    pub async fn remove_permission_identity(
        &self,
        provider: &str,
        identity: IdentityExpansion,
    ) -> SdkResult<()> {
        info!(provider, identity = %identity.name, "removing permission identity");
        let body = PermissionIdentityBody::new(identity);
        self.transport
            .execute(&PushRequest::DeletePermission {
                provider: provider.to_string(),
                body: PushCodec::encode_json(&body)?,
            })
            .await?;
        Ok(())
    }

    pub async fn delete_permissions_older_than(
        &self,
        provider: &str,
        ordering: OrderingToken,
    ) -> SdkResult<()> {
        info!(provider, %ordering, "deleting older permissions");
        self.transport
            .execute(&PushRequest::DeletePermissionsOlderThan {
                provider: provider.to_string(),
                ordering,
            })
            .await?;
        Ok(())
    }
}
