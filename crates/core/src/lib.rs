//! `stockbridge-core`: stock domain building blocks.
//!
//! Records of the remote stock backend as typed values, plus the pure rules
//! the orchestration layer applies before it touches the network.
//! No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod picking;
pub mod quant;
pub mod quantity;
pub mod record;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    LocationId, MoveId, MoveLineId, OperationId, PickingId, PickingTypeId, ProductId, QuantId,
    UomId,
};
pub use picking::{MoveLine, Picking, PickingState, PickingTypeCode, StockMove};
pub use quant::{AdjustmentKind, AdjustmentPlan, Quant};
pub use quantity::Quantity;
pub use record::Record;
