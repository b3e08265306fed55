//! Diagnostic channel
//!
//! Read-path failures are swallowed into fail-closed values. They are
//! reported here instead: logged through `tracing` and broadcast to any
//! subscriber (telemetry, debug panels, tests).

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::MemberId;

/// Something the engine degraded around
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// Member lookup found nobody; snapshot is all-none
    AuthenticationMissing { member_id: MemberId },
    /// Store failed or timed out; snapshot fell back to defaults
    StorageUnavailable { member_id: MemberId, reason: String },
    UnrecognizedAction { name: String },
    UnrecognizedCategory { name: String },
    /// A load finished after a newer one was started and was discarded
    LoadSuperseded { member_id: MemberId, generation: u64 },
    LoadCancelled { member_id: MemberId, generation: u64 },
    /// A write was refused or failed in the store
    WriteRejected { actor_id: MemberId, operation: String, reason: String },
    CacheInvalidated { member_id: MemberId },
    RequestResolved { request_id: Uuid, status: String },
}

/// Broadcast handle for diagnostic events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    sender: broadcast::Sender<DiagnosticEvent>,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<DiagnosticEvent> {
        self.sender.subscribe()
    }

    /// Log and publish an event. Never fails.
    pub fn emit(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::StorageUnavailable { member_id, reason } => {
                warn!(
                    member_id = %member_id,
                    reason = %reason,
                    "Permission load degraded to defaults"
                );
            }
            DiagnosticEvent::AuthenticationMissing { member_id } => {
                warn!(member_id = %member_id, "No member record, denying everything");
            }
            DiagnosticEvent::UnrecognizedAction { name } => {
                warn!(action = %name, "Denied unrecognized action");
            }
            DiagnosticEvent::UnrecognizedCategory { name } => {
                warn!(category = %name, "Denied unrecognized category");
            }
            DiagnosticEvent::WriteRejected {
                actor_id,
                operation,
                reason,
            } => {
                warn!(
                    actor_id = %actor_id,
                    operation = %operation,
                    reason = %reason,
                    "Write rejected"
                );
            }
            other => debug!(event = ?other, "Permission diagnostic"),
        }

        // No receivers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(64)
    }
}
