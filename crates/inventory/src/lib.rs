//! Inventory orchestration over a `StockGateway`.
//!
//! Sequences gateway calls into the two write operations (move stock between
//! locations, adjust an on-hand quantity) plus read-only stock views. Decisions
//! that need no backend state are taken by `stockbridge-core` first.

pub mod adjust;
pub mod error;
pub mod queries;
pub mod saga;
pub mod transfer;

pub use adjust::{AdjustRequest, AdjustmentOutcome, QuantityAdjuster};
pub use error::OperationError;
pub use queries::{StockQueries, StockQuery};
pub use saga::{Compensation, TransferFailure, TransferSaga, TransferStep};
pub use transfer::{
    MoveRequest, ReservationPolicy, TransferConfig, TransferOrchestrator, TransferOutcome,
};
