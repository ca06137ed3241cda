use std::sync::Arc;

use bytes::Bytes;
use pushline_protocol::PushRequest;
use pushline_transport::{PushTransport, TransferChannel};
use pushline_types::{
    BatchPermissions, CanonicalJson, IdentityExpansion, OrderingClock, OrderingToken,
    PermissionIdentityBody, ValidationError,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{BatchError, BatchResult};

/// Expansion updates for one security provider, uploaded as a single batch.
///
/// `start` mints the session token, `add_*` collects identity bodies, and
/// `end` uploads everything through a transfer location and registers it on
/// the provider's batch endpoint.
pub struct PermissionBatch {
    provider: String,
    channel: TransferChannel,
    transport: Arc<dyn PushTransport>,
    clock: Arc<dyn OrderingClock>,
    ceiling: usize,
    payload: BatchPermissions,
    token: Option<OrderingToken>,
}

impl PermissionBatch {
    pub fn new(
        provider: impl Into<String>,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn OrderingClock>,
        ceiling: usize,
    ) -> Self {
        Self {
            provider: provider.into(),
            channel: TransferChannel::new(transport.clone()),
            transport,
            clock,
            ceiling,
            payload: BatchPermissions::default(),
            token: None,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn token(&self) -> Option<OrderingToken> {
        self.token
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Mint a token and drop anything collected before.
    pub fn start(&mut self) -> OrderingToken {
        let token = self.clock.mint();
        self.token = Some(token);
        self.payload = BatchPermissions::default();
        debug!(provider = %self.provider, %token, "permission batch started");
        token
    }

    /// Members of a group identity.
    pub fn add_member(&mut self, body: PermissionIdentityBody) -> BatchResult<()> {
        self.ensure_started()?;
        self.payload.members.push(body);
        Ok(())
    }

    /// Alternate identities of the same user.
    pub fn add_mapping(&mut self, body: PermissionIdentityBody) -> BatchResult<()> {
        self.ensure_started()?;
        self.payload.mappings.push(body);
        Ok(())
    }

    /// Identities to remove from the security cache.
    pub fn add_deleted(&mut self, body: PermissionIdentityBody) -> BatchResult<()> {
        self.ensure_started()?;
        self.payload.deleted.push(body);
        Ok(())
    }

    /// Add a whole untyped batch (`members`, `mappings`, `deleted`).
    ///
    /// Everything is parsed before anything is added, so a malformed or
    /// mixed identity list leaves the batch unchanged.
    pub fn add_json(&mut self, value: &Value) -> BatchResult<usize> {
        self.ensure_started()?;
        let parsed = BatchPermissions::from_json(value)?;
        let count = parsed.len();
        self.payload.extend(parsed);
        debug!(provider = %self.provider, identities = count, "permission bodies added from JSON");
        Ok(count)
    }

    /// Shorthand for a body with only an identity and its members.
    pub fn add_members_of(
        &mut self,
        identity: IdentityExpansion,
        members: impl IntoIterator<Item = IdentityExpansion>,
    ) -> BatchResult<()> {
        let mut body = PermissionIdentityBody::new(identity);
        body.add_members(members);
        self.add_member(body)
    }

    /// Upload and register the batch, then delete everything older than the
    /// start token if requested. An empty batch uploads nothing.
    pub async fn end(&mut self, delete_older: bool) -> BatchResult<usize> {
        let token = self.token.take().ok_or(BatchError::NotStarted)?;
        let payload = std::mem::take(&mut self.payload);
        let count = payload.len();

        if !payload.is_empty() {
            let encoded = payload.to_canonical()?;
            if encoded.len() > self.ceiling {
                return Err(ValidationError::ItemTooLarge {
                    size: encoded.len(),
                    max: self.ceiling,
                }
                .into());
            }
            let file_id = self
                .channel
                .acquire_and_upload(Bytes::from(encoded))
                .await?;
            self.channel
                .register_permission_batch(&self.provider, &file_id)
                .await?;
            info!(provider = %self.provider, identities = count, %file_id, "permission batch registered");
        }

        if delete_older {
            info!(provider = %self.provider, %token, "deleting permissions older than batch start");
            self.transport
                .execute(&PushRequest::DeletePermissionsOlderThan {
                    provider: self.provider.clone(),
                    ordering: token,
                })
                .await?;
        }
        Ok(count)
    }

    fn ensure_started(&self) -> BatchResult<()> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(BatchError::NotStarted),
        }
    }
}
