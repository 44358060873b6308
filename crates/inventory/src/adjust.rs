//! Inventory adjustments on a (product, location) quant.

use serde_json::json;
use stockbridge_core::record;
use stockbridge_core::{
    AdjustmentKind, AdjustmentPlan, Entity, LocationId, OperationId, ProductId, Quant, QuantId,
    Quantity,
};
use stockbridge_gateway::{Filter, Page, StockGateway, values};
use tracing::Instrument;

use crate::error::OperationError;

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustRequest {
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// Signed change; negative removes stock.
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentOutcome {
    pub operation_id: OperationId,
    pub quant_id: QuantId,
    pub kind: AdjustmentKind,
    /// Absolute size of the change.
    pub amount: Quantity,
    /// Quantity the quant was set to (computed locally, not re-read).
    pub target: Quantity,
    pub message: String,
}

pub struct QuantityAdjuster<G> {
    gateway: G,
}

impl<G: StockGateway> QuantityAdjuster<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub async fn adjust_quantity(&self, request: AdjustRequest) -> Result<AdjustmentOutcome, OperationError> {
        let operation_id = OperationId::new();
        let span = tracing::info_span!(
            "adjust_quantity",
            operation_id = %operation_id,
            product_id = %request.product_id,
            location_id = %request.location_id,
        );
        self.run(operation_id, request).instrument(span).await
    }

    async fn run(&self, operation_id: OperationId, request: AdjustRequest) -> Result<AdjustmentOutcome, OperationError> {
        let delta = Quantity::delta(request.delta)?;
        let existing = self.current(request.product_id, request.location_id).await?;
        let plan = AdjustmentPlan::decide(existing, delta).inspect_err(|e| {
            tracing::info!(error = %e, "adjustment rejected");
        })?;

        let quant_id = match plan {
            AdjustmentPlan::Restage { quant_id, target } => {
                self.gateway
                    .update(
                        Quant::COLLECTION,
                        &[quant_id.get()],
                        values(json!({
                            "inventory_quantity": target,
                            "inventory_quantity_set": true,
                        })),
                    )
                    .await?;
                quant_id
            }
            AdjustmentPlan::Create { target } => {
                let id = self
                    .gateway
                    .create(
                        Quant::COLLECTION,
                        values(json!({
                            "product_id": request.product_id,
                            "location_id": request.location_id,
                            "inventory_quantity": target,
                            "inventory_quantity_set": true,
                        })),
                    )
                    .await?;
                QuantId::try_new(id)?
            }
        };

        self.gateway
            .invoke(Quant::COLLECTION, "action_apply_inventory", &[quant_id.get()], vec![])
            .await?;

        let kind = AdjustmentKind::of(delta);
        let amount = delta.abs();
        let target = plan.target();
        tracing::info!(%quant_id, verb = kind.verb(), %amount, %target, "inventory adjusted");

        Ok(AdjustmentOutcome {
            operation_id,
            quant_id,
            kind,
            amount,
            target,
            message: format!("{} {} units successfully", kind.verb(), amount),
        })
    }

    /// The quant for the pair and its on-hand quantity, if one exists.
    async fn current(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<(QuantId, Quantity)>, OperationError> {
        let rows = self
            .gateway
            .find_and_fetch(
                Quant::COLLECTION,
                &Filter::new()
                    .eq("product_id", product_id)
                    .eq("location_id", location_id),
                &["id", "quantity"],
                &Page::default().limit(1),
            )
            .await?;

        match rows.first() {
            None => Ok(None),
            Some(row) => {
                let id = QuantId::try_new(record::record_id(row)?)?;
                let quantity = Quantity::from_remote(record::float(row, "quantity")?)?;
                Ok(Some((id, quantity)))
            }
        }
    }
}
