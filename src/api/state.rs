use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::market::MarketData;
use crate::plan::approvals::AllowanceReader;
use crate::plan::{CallEncoder, GasOracle, PlanContext, PlanSessions};

/// Shared, read-only server state. Market data is a snapshot taken at
/// startup; every request works on its own strategy copy.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub market: Arc<MarketData>,
    pub encoder: Arc<dyn CallEncoder>,
    pub gas_oracle: Arc<dyn GasOracle>,
    pub allowance_reader: Arc<dyn AllowanceReader>,
    pub sessions: PlanSessions,
    pub config: EngineConfig,
}

impl AppState {
    pub fn new(
        market: MarketData,
        encoder: Arc<dyn CallEncoder>,
        gas_oracle: Arc<dyn GasOracle>,
        allowance_reader: Arc<dyn AllowanceReader>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                market: Arc::new(market),
                encoder,
                gas_oracle,
                allowance_reader,
                sessions: PlanSessions::new(),
                config,
            }),
        }
    }

    pub fn plan_context(&self, eth_price: f64) -> PlanContext {
        let inner = &self.inner;
        PlanContext::new(
            inner.market.clone(),
            eth_price,
            inner.encoder.clone(),
            inner.gas_oracle.clone(),
        )
        .with_ttl(inner.config.ttl())
        .with_gas_timeout(inner.config.gas_timeout())
        .with_max_passes(inner.config.optimizer.max_passes)
    }

    pub fn allowance_timeout(&self) -> Duration {
        self.inner.config.allowance_timeout()
    }
}
