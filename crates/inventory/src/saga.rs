//! Stock transfer saga.
//!
//! A move is a chain of independently committed backend calls:
//! 1. resolve the internal transfer type
//! 2. create the picking (draft)
//! 3. create its move
//! 4. confirm
//! 5. reserve
//! 6. set realised quantities on the move lines
//! 7. validate
//!
//! The ledger remembers which records exist so a failure can report them and
//! the picking can be cancelled (compensating action).

use serde::{Deserialize, Serialize};
use stockbridge_core::{MoveId, OperationId, PickingId};
use thiserror::Error;

use crate::error::OperationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStep {
    /// Local input checks; nothing has been sent yet.
    Precheck,
    ResolveType,
    CreatePicking,
    CreateMove,
    Confirm,
    Reserve,
    SetQuantities,
    Validate,
}

impl TransferStep {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStep::Precheck => "precheck",
            TransferStep::ResolveType => "resolve_type",
            TransferStep::CreatePicking => "create_picking",
            TransferStep::CreateMove => "create_move",
            TransferStep::Confirm => "confirm",
            TransferStep::Reserve => "reserve",
            TransferStep::SetQuantities => "set_quantities",
            TransferStep::Validate => "validate",
        }
    }
}

impl core::fmt::Display for TransferStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the partially built picking after a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Compensation {
    /// Nothing was persisted.
    NotNeeded,
    /// Compensation is disabled by configuration.
    Skipped,
    /// The picking was cancelled.
    Cancelled,
    /// `action_cancel` itself failed; the picking is left behind.
    Failed { reason: String },
}

/// Progress ledger of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSaga {
    operation_id: OperationId,
    picking_id: Option<PickingId>,
    move_id: Option<MoveId>,
    completed: Option<TransferStep>,
}

impl TransferSaga {
    pub fn new(operation_id: OperationId) -> Self {
        Self {
            operation_id,
            picking_id: None,
            move_id: None,
            completed: None,
        }
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    pub fn picking_id(&self) -> Option<PickingId> {
        self.picking_id
    }

    pub fn move_id(&self) -> Option<MoveId> {
        self.move_id
    }

    /// Last step that finished successfully.
    pub fn completed(&self) -> Option<TransferStep> {
        self.completed
    }

    pub fn complete(&mut self, step: TransferStep) {
        self.completed = Some(step);
    }

    pub fn picking_created(&mut self, id: PickingId) {
        self.picking_id = Some(id);
        self.completed = Some(TransferStep::CreatePicking);
    }

    pub fn move_created(&mut self, id: MoveId) {
        self.move_id = Some(id);
        self.completed = Some(TransferStep::CreateMove);
    }

    /// Whether a failure now leaves records on the backend.
    pub fn has_persisted_records(&self) -> bool {
        self.picking_id.is_some()
    }

    pub fn failure(
        &self,
        step: TransferStep,
        error: OperationError,
        compensation: Compensation,
    ) -> TransferFailure {
        TransferFailure {
            step,
            error,
            picking_id: self.picking_id,
            move_id: self.move_id,
            compensation,
        }
    }
}

/// A move that did not complete.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("stock move failed at {step}: {error}")]
pub struct TransferFailure {
    pub step: TransferStep,
    #[source]
    pub error: OperationError,
    pub picking_id: Option<PickingId>,
    pub move_id: Option<MoveId>,
    pub compensation: Compensation,
}

impl TransferFailure {
    pub fn compensated(&self) -> bool {
        matches!(self.compensation, Compensation::Cancelled)
    }

    /// Failure before anything reached the backend.
    pub fn partially_executed(&self) -> bool {
        self.picking_id.is_some()
    }
}
