//! Strongly-typed identifiers used across the domain.
//!
//! Backend records are keyed by positive integers; each collection gets its
//! own newtype so a quant id can never be passed where a picking id is
//! expected.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a product (`product.product`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

/// Identifier of a stock location (`stock.location`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(i64);

/// Identifier of a transfer (`stock.picking`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickingId(i64);

/// Identifier of a transfer type (`stock.picking.type`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickingTypeId(i64);

/// Identifier of a requested move (`stock.move`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveId(i64);

/// Identifier of a realised move line (`stock.move.line`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveLineId(i64);

/// Identifier of a quant (`stock.quant`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuantId(i64);

/// Identifier of a unit of measure (`uom.uom`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UomId(i64);

macro_rules! impl_record_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Checked constructor: backend ids are strictly positive.
            pub fn try_new(raw: i64) -> Result<Self, DomainError> {
                if raw <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, raw
                    )));
                }
                Ok(Self(raw))
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl From<$t> for serde_json::Value {
            fn from(value: $t) -> Self {
                serde_json::Value::from(value.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Self::try_new(raw)
            }
        }
    };
}

impl_record_newtype!(ProductId, "ProductId");
impl_record_newtype!(LocationId, "LocationId");
impl_record_newtype!(PickingId, "PickingId");
impl_record_newtype!(PickingTypeId, "PickingTypeId");
impl_record_newtype!(MoveId, "MoveId");
impl_record_newtype!(MoveLineId, "MoveLineId");
impl_record_newtype!(QuantId, "QuantId");
impl_record_newtype!(UomId, "UomId");

/// Correlation id of one orchestration call (log correlation only; never sent
/// to the backend).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Uses UUIDv7 (time-ordered) so log lines sort by start time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_positive_ids() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn parse_rejects_zero_and_negative() {
        assert!(matches!("0".parse::<LocationId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<QuantId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("abc".parse::<PickingId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_value(PickingId::new(17)).unwrap();
        assert_eq!(json, serde_json::json!(17));
        let back: PickingId = serde_json::from_value(json).unwrap();
        assert_eq!(back, PickingId::new(17));
    }
}
