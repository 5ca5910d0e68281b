//! Component wiring
//!
//! Owns construction of the store client and every ledger component, in
//! dependency order, from one configuration value. The aggregation sink is
//! registered with the poster, the lifecycle manager, and the audit engine,
//! so every path that mutates vouchers keeps the rollups in step.

use std::sync::Arc;

use core_kernel::{ActorId, CoreError};
use domain_ledger::{
    AccountRegistry, AuditEngine, ChartOfAccountsBuilder, JournalPoster, VoucherEventSink,
    VoucherLifecycleManager,
};
use domain_rollup::{AggregationSink, PeriodAggregator, ShardedCounter};
use infra_store::Store;

use crate::config::LedgerConfig;

/// Fully wired ledger core
pub struct AppContext {
    pub store: Store,
    pub registry: Arc<AccountRegistry>,
    pub poster: Arc<JournalPoster>,
    pub lifecycle: VoucherLifecycleManager,
    pub aggregator: PeriodAggregator,
    pub chart: ChartOfAccountsBuilder,
    pub audit: AuditEngine,
}

impl AppContext {
    /// Builds the full component graph over a fresh store
    pub fn new(config: &LedgerConfig, registry: AccountRegistry) -> Result<Self, CoreError> {
        Self::with_store(Store::new(config.store_config()), config, registry)
    }

    /// Builds the component graph over an existing store handle
    pub fn with_store(
        store: Store,
        config: &LedgerConfig,
        registry: AccountRegistry,
    ) -> Result<Self, CoreError> {
        let registry = Arc::new(registry);
        let timezone = config.timezone()?;
        let policy = config.repair_policy()?;

        let counter = ShardedCounter::new(store.clone()).with_shards(config.counter_shards);
        let aggregator = PeriodAggregator::new(counter, timezone);
        let sink: Arc<dyn VoucherEventSink> =
            Arc::new(AggregationSink::new(aggregator.clone(), registry.clone()));

        let poster = Arc::new(
            JournalPoster::new(store.clone(), registry.clone()).with_sink(sink.clone()),
        );
        let lifecycle = VoucherLifecycleManager::new(store.clone()).with_sink(sink.clone());
        let chart = ChartOfAccountsBuilder::new(store.clone(), registry.clone());
        let audit = AuditEngine::new(store.clone(), poster.clone())
            .with_policy(policy)
            .with_actor(ActorId::new())
            .with_sink(sink);

        Ok(Self {
            store,
            registry,
            poster,
            lifecycle,
            aggregator,
            chart,
            audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builds_from_defaults() {
        let context = AppContext::new(&LedgerConfig::default(), AccountRegistry::standard());
        assert!(context.is_ok());
    }

    #[test]
    fn test_context_rejects_bad_timezone() {
        let config = LedgerConfig {
            timezone: "Nowhere/Null".to_string(),
            ..Default::default()
        };
        assert!(AppContext::new(&config, AccountRegistry::standard()).is_err());
    }
}
