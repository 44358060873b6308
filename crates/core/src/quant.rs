//! Quants and the pure arithmetic of inventory adjustments.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{LocationId, ProductId, QuantId};
use crate::quantity::Quantity;
use crate::record::{self, Record};

/// System-of-record row for "how much of product P sits at location L".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quant {
    pub id: QuantId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: Quantity,
    pub reserved_quantity: Quantity,
}

impl Quant {
    pub const FIELDS: &'static [&'static str] = &[
        "id",
        "product_id",
        "location_id",
        "quantity",
        "reserved_quantity",
    ];

    pub fn from_record(rec: &Record) -> DomainResult<Self> {
        Ok(Self {
            id: QuantId::try_new(record::record_id(rec)?)?,
            product_id: ProductId::try_new(record::required_many2one(rec, "product_id")?)?,
            location_id: LocationId::try_new(record::required_many2one(rec, "location_id")?)?,
            quantity: Quantity::from_remote(record::float(rec, "quantity")?)?,
            reserved_quantity: Quantity::from_remote(record::float(rec, "reserved_quantity")?)?,
        })
    }
}

impl Entity for Quant {
    type Id = QuantId;
    const COLLECTION: &'static str = "stock.quant";

    fn id(&self) -> QuantId {
        self.id
    }
}

/// Direction of an adjustment, derived from the sign of its delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    Added,
    Removed,
}

impl AdjustmentKind {
    pub fn of(delta: Quantity) -> Self {
        if delta.is_negative() {
            AdjustmentKind::Removed
        } else {
            AdjustmentKind::Added
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            AdjustmentKind::Added => "Added",
            AdjustmentKind::Removed => "Removed",
        }
    }
}

/// What an adjustment will do to the backend, decided before any mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdjustmentPlan {
    /// Stage `target` on the existing quant and apply it.
    Restage { quant_id: QuantId, target: Quantity },
    /// Create a fresh quant staged at `target` and apply it.
    Create { target: Quantity },
}

impl AdjustmentPlan {
    /// Decide the adjustment for `delta` given the quantity currently on hand
    /// (`None` when no quant exists for the pair).
    ///
    /// Removing stock that does not exist, or more stock than is on hand, is
    /// rejected. Additions always restage, even onto a quant already below
    /// zero.
    pub fn decide(existing: Option<(QuantId, Quantity)>, delta: Quantity) -> DomainResult<Self> {
        match existing {
            Some((quant_id, current)) => {
                let target = current.plus(delta);
                if delta.is_negative() && target.is_negative() {
                    return Err(DomainError::validation(format!(
                        "cannot remove {} units: only {} on hand",
                        delta.abs(),
                        current
                    )));
                }
                Ok(AdjustmentPlan::Restage { quant_id, target })
            }
            None => {
                if delta.is_negative() {
                    return Err(DomainError::validation(
                        "Cannot remove stock that doesn't exist at this location",
                    ));
                }
                Ok(AdjustmentPlan::Create { target: delta })
            }
        }
    }

    pub fn target(&self) -> Quantity {
        match self {
            AdjustmentPlan::Restage { target, .. } | AdjustmentPlan::Create { target } => *target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(v: f64) -> Quantity {
        Quantity::from_remote(v).unwrap()
    }

    #[test]
    fn removing_from_existing_quant_subtracts() {
        let plan = AdjustmentPlan::decide(Some((QuantId::new(1), q(10.0))), q(-4.0)).unwrap();
        assert_eq!(
            plan,
            AdjustmentPlan::Restage {
                quant_id: QuantId::new(1),
                target: q(6.0)
            }
        );
        assert_eq!(AdjustmentKind::of(q(-4.0)).verb(), "Removed");
    }

    #[test]
    fn adding_without_quant_creates_one() {
        let plan = AdjustmentPlan::decide(None, q(15.0)).unwrap();
        assert_eq!(plan, AdjustmentPlan::Create { target: q(15.0) });
        assert_eq!(AdjustmentKind::of(q(15.0)).verb(), "Added");
    }

    #[test]
    fn removing_without_quant_is_rejected() {
        let err = AdjustmentPlan::decide(None, q(-1.0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn removing_below_zero_is_rejected() {
        let err = AdjustmentPlan::decide(Some((QuantId::new(3), q(2.0))), q(-5.0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn adding_to_negative_quant_restages() {
        let plan = AdjustmentPlan::decide(Some((QuantId::new(3), q(-5.0))), q(3.0)).unwrap();
        assert_eq!(
            plan,
            AdjustmentPlan::Restage {
                quant_id: QuantId::new(3),
                target: q(-2.0)
            }
        );
    }

    #[test]
    fn quant_parses_relation_pairs() {
        let rec = serde_json::json!({
            "id": 9,
            "product_id": [42, "Widget"],
            "location_id": [7, "WH/Stock"],
            "quantity": 10.0,
            "reserved_quantity": 2.0,
        });
        let quant = Quant::from_record(rec.as_object().unwrap()).unwrap();
        assert_eq!(quant.product_id, ProductId::new(42));
        assert_eq!(quant.quantity.get(), 10.0);
        assert_eq!(quant.reserved_quantity.get(), 2.0);
    }

    proptest! {
        #[test]
        fn restaged_target_is_current_plus_delta(
            current in 0i32..100_000,
            delta in -100_000i32..100_000,
        ) {
            prop_assume!(delta != 0);
            prop_assume!(current + delta >= 0);
            let plan = AdjustmentPlan::decide(
                Some((QuantId::new(1), q(current as f64))),
                Quantity::delta(delta as f64).unwrap(),
            ).unwrap();
            prop_assert_eq!(plan.target().get(), (current + delta) as f64);
        }

        #[test]
        fn positive_delta_always_restages(current in -1_000i32..1_000, delta in 1i32..1_000) {
            let plan = AdjustmentPlan::decide(
                Some((QuantId::new(1), q(current as f64))),
                Quantity::delta(delta as f64).unwrap(),
            ).unwrap();
            prop_assert_eq!(plan.target().get(), (current + delta) as f64);
        }

        #[test]
        fn negative_delta_without_quant_never_plans_a_mutation(delta in -100_000i32..0) {
            let res = AdjustmentPlan::decide(None, Quantity::delta(delta as f64).unwrap());
            prop_assert!(matches!(res, Err(DomainError::Validation(_))));
        }
    }
}
