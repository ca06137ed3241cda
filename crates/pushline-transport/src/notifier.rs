use std::sync::Arc;

use pushline_protocol::{PushRequest, SourceStatus};
use tracing::info;

use crate::error::TransportResult;
use crate::transport::PushTransport;

/// Reports the activity status of the source.
#[derive(Clone)]
pub struct StatusNotifier {
    transport: Arc<dyn PushTransport>,
}

impl StatusNotifier {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self { transport }
    }

    pub async fn notify(&self, status: SourceStatus) -> TransportResult<()> {
        info!(%status, "changing source status");
        self.transport
            .execute(&PushRequest::UpdateStatus { status })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    #[tokio::test]
    async fn sends_status_type() {
        let memory = Arc::new(MemoryTransport::new());
        let notifier = StatusNotifier::new(memory.clone());
        notifier.notify(SourceStatus::Rebuild).await.unwrap();
        notifier.notify(SourceStatus::Idle).await.unwrap();

        let calls = memory.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].route.query, vec![("statusType", "REBUILD".to_string())]);
        assert_eq!(calls[1].route.query, vec![("statusType", "IDLE".to_string())]);
    }

    #[tokio::test]
    async fn rejected_status_is_an_error() {
        let memory = Arc::new(MemoryTransport::new());
        memory.fail_next("UpdateStatus", 412);
        let notifier = StatusNotifier::new(memory);
        assert!(notifier.notify(SourceStatus::Refresh).await.is_err());
    }
}
