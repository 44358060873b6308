use std::sync::Arc;

use stockbridge_gateway::{
    GatewayError, HttpJsonRpc, InMemoryStockBackend, OdooGateway, SessionManager, StockGateway,
};
use stockbridge_inventory::{QuantityAdjuster, StockQueries, TransferConfig, TransferOrchestrator};

use crate::config::{ApiConfig, BackendKind};

pub const SERVICE_NAME: &str = "stockbridge-api";

type SharedGateway = Arc<dyn StockGateway>;

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub gateway: SharedGateway,
    pub transfers: TransferOrchestrator<SharedGateway>,
    pub adjuster: QuantityAdjuster<SharedGateway>,
    pub queries: StockQueries<SharedGateway>,
    /// Present for the remote backend; released on shutdown.
    pub sessions: Option<Arc<SessionManager>>,
}

impl AppServices {
    pub fn new(
        gateway: SharedGateway,
        transfer: TransferConfig,
        sessions: Option<Arc<SessionManager>>,
    ) -> Self {
        Self {
            transfers: TransferOrchestrator::new(gateway.clone(), transfer),
            adjuster: QuantityAdjuster::new(gateway.clone()),
            queries: StockQueries::new(gateway.clone()),
            gateway,
            sessions,
        }
    }

    /// Services over an in-memory backend (dev mode and tests).
    pub fn in_memory(backend: Arc<InMemoryStockBackend>, transfer: TransferConfig) -> Self {
        Self::new(backend, transfer, None)
    }

    pub async fn shutdown(&self) {
        if let Some(sessions) = &self.sessions {
            sessions.release().await;
        }
    }
}

/// Wire the configured backend. No network call happens here; the session is
/// acquired by the first request.
pub fn build_services(config: &ApiConfig) -> Result<AppServices, GatewayError> {
    match config.backend {
        BackendKind::Memory => {
            tracing::warn!("STOCK_BACKEND=memory; stock state is not persisted");
            Ok(AppServices::in_memory(
                Arc::new(InMemoryStockBackend::with_internal_picking_type()),
                config.transfer.clone(),
            ))
        }
        BackendKind::Odoo => {
            let transport = HttpJsonRpc::new(&config.gateway)?;
            let sessions = Arc::new(SessionManager::new(config.gateway.credentials()));
            let gateway = OdooGateway::new(Arc::new(transport), sessions.clone());
            tracing::info!(
                url = %config.gateway.url,
                database = %config.gateway.database,
                "using remote stock backend"
            );
            Ok(AppServices::new(
                Arc::new(gateway),
                config.transfer.clone(),
                Some(sessions),
            ))
        }
    }
}
