//! Active-phase state machine.

use serde_json::json;

use super::{SessionContext, WorkflowError};
use crate::core::PhaseOrder;
use crate::model::{next_stamp, Phase, ProjectRecord};
use crate::store::patch;

/// Selects the active phase of a project.
///
/// Under [`PhaseOrder::Free`] every phase is reachable from every phase.
/// [`PhaseOrder::Sequential`] rejects moving back to an earlier phase.
pub struct PhaseController {
    ctx: SessionContext,
}

impl PhaseController {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub fn policy(&self) -> PhaseOrder {
        self.ctx.settings.phase_order
    }

    /// Whether `from -> to` is allowed under the current policy.
    pub fn can_transition(&self, from: Phase, to: Phase) -> bool {
        match self.policy() {
            PhaseOrder::Free => true,
            PhaseOrder::Sequential => to >= from,
        }
    }

    /// Phases selectable from `from`.
    pub fn reachable(&self, from: Phase) -> Vec<Phase> {
        Phase::ALL.into_iter().filter(|to| self.can_transition(from, *to)).collect()
    }

    /// Make `phase` the active phase. Only `status` and `updatedAt` change.
    pub async fn select(
        &self,
        record: &mut ProjectRecord,
        phase: Phase,
    ) -> Result<(), WorkflowError> {
        if !self.can_transition(record.status, phase) {
            return Err(WorkflowError::TransitionRejected { from: record.status, to: phase });
        }

        let updated_at = next_stamp(record.updated_at);
        self.ctx
            .persist(
                &record.id,
                patch([
                    ("status", json!(phase)),
                    ("updatedAt", json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        let previous = record.status;
        record.status = phase;
        record.updated_at = updated_at;

        tracing::info!(project = %record.id, from = %previous, to = %phase, "Phase selected");
        Ok(())
    }
}
