//! Moving stock between two internal locations.

use core::future::Future;
use core::str::FromStr;

use serde_json::json;
use stockbridge_core::record::{self, Record};
use stockbridge_core::{
    Entity, LocationId, MoveId, MoveLine, OperationId, Picking, PickingId, PickingTypeCode,
    PickingTypeId, ProductId, Quantity, StockMove, UomId,
};
use stockbridge_gateway::{Filter, Page, StockGateway, values};
use tracing::Instrument;

use crate::error::OperationError;
use crate::saga::{Compensation, TransferFailure, TransferSaga, TransferStep};

const PICKING_TYPE: &str = "stock.picking.type";

/// What to do when reservation leaves the picking short of `assigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationPolicy {
    /// Log a warning and force the requested quantity onto the lines anyway.
    #[default]
    Proceed,
    /// Fail the move and compensate.
    Abort,
}

impl FromStr for ReservationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proceed" => Ok(ReservationPolicy::Proceed),
            "abort" => Ok(ReservationPolicy::Abort),
            other => Err(format!("unknown reservation policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub reservation_policy: ReservationPolicy,
    /// Cancel the picking when a later step fails.
    pub compensate_on_failure: bool,
    /// Counting unit set on created moves.
    pub default_uom: UomId,
    /// Move-line field holding the realised quantity (`quantity` on current
    /// backends, `qty_done` on older ones).
    pub done_field: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            reservation_policy: ReservationPolicy::Proceed,
            compensate_on_failure: true,
            default_uom: UomId::new(1),
            done_field: "quantity".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveRequest {
    pub product_id: ProductId,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub quantity: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub operation_id: OperationId,
    pub picking_id: PickingId,
    pub move_id: MoveId,
    pub quantity: Quantity,
    pub message: String,
}

/// Runs the transfer saga against a `StockGateway`.
pub struct TransferOrchestrator<G> {
    gateway: G,
    config: TransferConfig,
}

impl<G: StockGateway> TransferOrchestrator<G> {
    pub fn new(gateway: G, config: TransferConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub async fn move_stock(&self, request: MoveRequest) -> Result<TransferOutcome, TransferFailure> {
        let operation_id = OperationId::new();
        let span = tracing::info_span!(
            "move_stock",
            operation_id = %operation_id,
            product_id = %request.product_id,
            from = %request.from_location_id,
            to = %request.to_location_id,
        );
        self.run(TransferSaga::new(operation_id), request)
            .instrument(span)
            .await
    }

    async fn run(&self, mut saga: TransferSaga, request: MoveRequest) -> Result<TransferOutcome, TransferFailure> {
        let quantity = match precheck(&request) {
            Ok(q) => q,
            Err(error) => {
                tracing::info!(%error, "move rejected");
                return Err(saga.failure(TransferStep::Precheck, error, Compensation::NotNeeded));
            }
        };
        saga.complete(TransferStep::Precheck);

        let picking_type = self
            .step(&mut saga, TransferStep::ResolveType, self.resolve_internal_type())
            .await?;

        let picking_id = self
            .step(
                &mut saga,
                TransferStep::CreatePicking,
                self.create_picking(picking_type, &request),
            )
            .await?;
        saga.picking_created(picking_id);

        let move_id = self
            .step(
                &mut saga,
                TransferStep::CreateMove,
                self.create_move(picking_id, &request, quantity),
            )
            .await?;
        saga.move_created(move_id);

        self.step(
            &mut saga,
            TransferStep::Confirm,
            self.run_action(picking_id, "action_confirm"),
        )
        .await?;

        self.step(&mut saga, TransferStep::Reserve, self.reserve(picking_id))
            .await?;

        self.step(
            &mut saga,
            TransferStep::SetQuantities,
            self.set_line_quantities(picking_id, quantity),
        )
        .await?;

        self.step(
            &mut saga,
            TransferStep::Validate,
            self.run_action(picking_id, "button_validate"),
        )
        .await?;

        tracing::info!(%picking_id, %move_id, %quantity, "stock moved");
        Ok(TransferOutcome {
            operation_id: saga.operation_id(),
            picking_id,
            move_id,
            quantity,
            message: format!("Moved {quantity} units successfully"),
        })
    }

    /// Await one step; on failure compensate and turn the error into a
    /// `TransferFailure`.
    async fn step<T>(
        &self,
        saga: &mut TransferSaga,
        step: TransferStep,
        work: impl Future<Output = Result<T, OperationError>>,
    ) -> Result<T, TransferFailure> {
        match work.await {
            Ok(v) => {
                saga.complete(step);
                tracing::debug!(%step, "transfer step completed");
                Ok(v)
            }
            Err(error) => Err(self.fail(saga, step, error).await),
        }
    }

    async fn fail(&self, saga: &TransferSaga, step: TransferStep, error: OperationError) -> TransferFailure {
        tracing::error!(
            %step,
            %error,
            picking_id = ?saga.picking_id(),
            move_id = ?saga.move_id(),
            "transfer step failed"
        );

        let compensation = match saga.picking_id() {
            None => Compensation::NotNeeded,
            Some(_) if !self.config.compensate_on_failure => {
                tracing::warn!("compensation disabled; picking left in place");
                Compensation::Skipped
            }
            Some(picking_id) => {
                match self
                    .gateway
                    .invoke(Picking::COLLECTION, "action_cancel", &[picking_id.get()], vec![])
                    .await
                {
                    Ok(_) => {
                        tracing::info!(%picking_id, "picking cancelled");
                        Compensation::Cancelled
                    }
                    Err(e) => {
                        tracing::warn!(%picking_id, error = %e, "failed to cancel picking");
                        Compensation::Failed { reason: e.to_string() }
                    }
                }
            }
        };

        saga.failure(step, error, compensation)
    }

    async fn resolve_internal_type(&self) -> Result<PickingTypeId, OperationError> {
        let rows = self
            .gateway
            .find_and_fetch(
                PICKING_TYPE,
                &Filter::new().eq("code", PickingTypeCode::Internal.as_str()),
                &["id", "name"],
                &Page::default().limit(1),
            )
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| OperationError::NotFound("Internal transfer type not found".to_string()))?;
        Ok(PickingTypeId::try_new(record::record_id(row)?)?)
    }

    async fn create_picking(
        &self,
        picking_type: PickingTypeId,
        request: &MoveRequest,
    ) -> Result<PickingId, OperationError> {
        let mut vals: Record = values(json!({
            "picking_type_id": picking_type,
            "location_id": request.from_location_id,
            "location_dest_id": request.to_location_id,
        }));
        if let Some(note) = request.note.as_deref().filter(|n| !n.is_empty()) {
            vals.insert("note".to_string(), json!(note));
        }
        let id = self.gateway.create(Picking::COLLECTION, vals).await?;
        Ok(PickingId::try_new(id)?)
    }

    async fn create_move(
        &self,
        picking_id: PickingId,
        request: &MoveRequest,
        quantity: Quantity,
    ) -> Result<MoveId, OperationError> {
        let vals = values(json!({
            "name": "Product Move",
            "picking_id": picking_id,
            "product_id": request.product_id,
            "product_uom_qty": quantity,
            "location_id": request.from_location_id,
            "location_dest_id": request.to_location_id,
            "product_uom": self.config.default_uom,
        }));
        let id = self.gateway.create(StockMove::COLLECTION, vals).await?;
        Ok(MoveId::try_new(id)?)
    }

    async fn run_action(&self, picking_id: PickingId, action: &str) -> Result<(), OperationError> {
        self.gateway
            .invoke(Picking::COLLECTION, action, &[picking_id.get()], vec![])
            .await?;
        Ok(())
    }

    /// Reserve stock, then branch on how much of it the backend could reserve.
    async fn reserve(&self, picking_id: PickingId) -> Result<(), OperationError> {
        self.run_action(picking_id, "action_assign").await?;

        let rows = self
            .gateway
            .fetch(Picking::COLLECTION, &[picking_id.get()], Picking::FIELDS)
            .await?;
        let state = match rows.first() {
            Some(row) => Picking::from_record(row)?.state,
            None => return Err(OperationError::Remote(format!("picking {picking_id} vanished"))),
        };

        if state.is_fully_reserved() {
            return Ok(());
        }
        match self.config.reservation_policy {
            ReservationPolicy::Proceed => {
                tracing::warn!(%picking_id, %state, "picking not fully reserved; proceeding");
                Ok(())
            }
            ReservationPolicy::Abort => Err(OperationError::validation(format!(
                "insufficient stock reserved (picking is {state})"
            ))),
        }
    }

    /// Force the requested quantity onto every line reservation produced.
    ///
    /// Each line gets the full quantity, so a move split into several lines
    /// realises a multiple of it on validate.
    async fn set_line_quantities(&self, picking_id: PickingId, quantity: Quantity) -> Result<(), OperationError> {
        let rows = self
            .gateway
            .find_and_fetch(
                MoveLine::COLLECTION,
                &Filter::new().eq("picking_id", picking_id),
                MoveLine::FIELDS,
                &Page::default(),
            )
            .await?;
        let line_ids = rows
            .iter()
            .map(|r| MoveLine::from_record(r).map(|line| line.id().get()))
            .collect::<Result<Vec<_>, _>>()?;
        if line_ids.is_empty() {
            tracing::warn!(%picking_id, "no move lines to update");
            return Ok(());
        }

        let mut vals = Record::new();
        vals.insert(self.config.done_field.clone(), json!(quantity));
        self.gateway.update(MoveLine::COLLECTION, &line_ids, vals).await?;
        Ok(())
    }
}

fn precheck(request: &MoveRequest) -> Result<Quantity, OperationError> {
    let quantity = Quantity::positive(request.quantity)?;
    if request.from_location_id == request.to_location_id {
        return Err(OperationError::validation(
            "source and destination locations must differ",
        ));
    }
    Ok(quantity)
}
