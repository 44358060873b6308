//! Transfers (pickings), their requested moves and realised move lines.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{LocationId, MoveId, MoveLineId, PickingId, PickingTypeId, ProductId};
use crate::quantity::Quantity;
use crate::record::{self, Record};

/// Transfer lifecycle as reported by the backend.
///
/// The orchestrated path is `Draft → Confirmed → Assigned → Done`; `Waiting`
/// and `Cancelled` are states the backend may also report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickingState {
    Draft,
    Waiting,
    Confirmed,
    Assigned,
    Done,
    #[serde(rename = "cancel")]
    Cancelled,
}

impl PickingState {
    pub fn as_str(self) -> &'static str {
        match self {
            PickingState::Draft => "draft",
            PickingState::Waiting => "waiting",
            PickingState::Confirmed => "confirmed",
            PickingState::Assigned => "assigned",
            PickingState::Done => "done",
            PickingState::Cancelled => "cancel",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "draft" => Ok(PickingState::Draft),
            "waiting" => Ok(PickingState::Waiting),
            "confirmed" => Ok(PickingState::Confirmed),
            "assigned" => Ok(PickingState::Assigned),
            "done" => Ok(PickingState::Done),
            "cancel" => Ok(PickingState::Cancelled),
            other => Err(DomainError::malformed(format!("unknown picking state '{other}'"))),
        }
    }

    /// Whether the reservation step fully reserved the requested stock.
    pub fn is_fully_reserved(self) -> bool {
        matches!(self, PickingState::Assigned)
    }
}

impl core::fmt::Display for PickingState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer-type classifier (`code` on `stock.picking.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickingTypeCode {
    Incoming,
    Outgoing,
    Internal,
}

impl PickingTypeCode {
    pub fn as_str(self) -> &'static str {
        match self {
            PickingTypeCode::Incoming => "incoming",
            PickingTypeCode::Outgoing => "outgoing",
            PickingTypeCode::Internal => "internal",
        }
    }
}

/// A transfer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picking {
    pub id: PickingId,
    pub picking_type_id: Option<PickingTypeId>,
    pub location_id: LocationId,
    pub location_dest_id: LocationId,
    pub state: PickingState,
    pub note: Option<String>,
}

impl Picking {
    pub const FIELDS: &'static [&'static str] = &[
        "id",
        "picking_type_id",
        "location_id",
        "location_dest_id",
        "state",
        "note",
    ];

    pub fn from_record(rec: &Record) -> DomainResult<Self> {
        let state = record::text(rec, "state")
            .ok_or_else(|| DomainError::malformed("picking: missing state"))?;
        Ok(Self {
            id: PickingId::try_new(record::record_id(rec)?)?,
            picking_type_id: record::many2one(rec, "picking_type_id")?
                .map(PickingTypeId::try_new)
                .transpose()?,
            location_id: LocationId::try_new(record::required_many2one(rec, "location_id")?)?,
            location_dest_id: LocationId::try_new(record::required_many2one(
                rec,
                "location_dest_id",
            )?)?,
            state: PickingState::parse(&state)?,
            note: record::text(rec, "note"),
        })
    }
}

impl Entity for Picking {
    type Id = PickingId;
    const COLLECTION: &'static str = "stock.picking";

    fn id(&self) -> PickingId {
        self.id
    }
}

/// A requested product movement inside a transfer (`stock.move`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMove {
    pub id: MoveId,
    pub picking_id: Option<PickingId>,
    pub product_id: ProductId,
    /// Requested quantity (`product_uom_qty`).
    pub product_uom_qty: Quantity,
    pub location_id: LocationId,
    pub location_dest_id: LocationId,
    pub state: Option<String>,
    pub reference: Option<String>,
    /// Scheduled/effective date as the backend formats it.
    pub date: Option<String>,
}

impl StockMove {
    pub const FIELDS: &'static [&'static str] = &[
        "id",
        "picking_id",
        "product_id",
        "product_uom_qty",
        "location_id",
        "location_dest_id",
        "state",
        "reference",
        "date",
    ];

    pub fn from_record(rec: &Record) -> DomainResult<Self> {
        Ok(Self {
            id: MoveId::try_new(record::record_id(rec)?)?,
            picking_id: record::many2one(rec, "picking_id")?
                .map(PickingId::try_new)
                .transpose()?,
            product_id: ProductId::try_new(record::required_many2one(rec, "product_id")?)?,
            product_uom_qty: Quantity::from_remote(record::float(rec, "product_uom_qty")?)?,
            location_id: LocationId::try_new(record::required_many2one(rec, "location_id")?)?,
            location_dest_id: LocationId::try_new(record::required_many2one(
                rec,
                "location_dest_id",
            )?)?,
            state: record::text(rec, "state"),
            reference: record::text(rec, "reference"),
            date: record::text(rec, "date"),
        })
    }
}

impl Entity for StockMove {
    type Id = MoveId;
    const COLLECTION: &'static str = "stock.move";

    fn id(&self) -> MoveId {
        self.id
    }
}

/// A realised line generated by reservation (`stock.move.line`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    pub id: MoveLineId,
    pub picking_id: Option<PickingId>,
    pub move_id: Option<MoveId>,
    pub product_id: Option<ProductId>,
}

impl MoveLine {
    pub const FIELDS: &'static [&'static str] = &["id", "picking_id", "move_id", "product_id"];

    pub fn from_record(rec: &Record) -> DomainResult<Self> {
        Ok(Self {
            id: MoveLineId::try_new(record::record_id(rec)?)?,
            picking_id: record::many2one(rec, "picking_id")?
                .map(PickingId::try_new)
                .transpose()?,
            move_id: record::many2one(rec, "move_id")?.map(MoveId::try_new).transpose()?,
            product_id: record::many2one(rec, "product_id")?
                .map(ProductId::try_new)
                .transpose()?,
        })
    }
}

impl Entity for MoveLine {
    type Id = MoveLineId;
    const COLLECTION: &'static str = "stock.move.line";

    fn id(&self) -> MoveLineId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picking_state_round_trips_backend_strings() {
        for s in ["draft", "waiting", "confirmed", "assigned", "done", "cancel"] {
            assert_eq!(PickingState::parse(s).unwrap().as_str(), s);
        }
        assert!(PickingState::parse("exploded").is_err());
    }

    #[test]
    fn only_assigned_counts_as_fully_reserved() {
        assert!(PickingState::Assigned.is_fully_reserved());
        assert!(!PickingState::Confirmed.is_fully_reserved());
        assert!(!PickingState::Waiting.is_fully_reserved());
    }

    #[test]
    fn picking_from_search_read_record() {
        let rec = json!({
            "id": 31,
            "picking_type_id": [5, "WH: Internal Transfers"],
            "location_id": [1, "WH/Stock"],
            "location_dest_id": [2, "WH/Stock/Shelf 1"],
            "state": "assigned",
            "note": false,
        });
        let p = Picking::from_record(rec.as_object().unwrap()).unwrap();
        assert_eq!(p.id, PickingId::new(31));
        assert_eq!(p.picking_type_id, Some(PickingTypeId::new(5)));
        assert_eq!(p.state, PickingState::Assigned);
        assert_eq!(p.note, None);
    }

    #[test]
    fn stock_move_requires_product() {
        let rec = json!({
            "id": 4,
            "product_id": false,
            "product_uom_qty": 3.0,
            "location_id": 1,
            "location_dest_id": 2,
        });
        assert!(matches!(
            StockMove::from_record(rec.as_object().unwrap()),
            Err(DomainError::Malformed(_))
        ));
    }
}
