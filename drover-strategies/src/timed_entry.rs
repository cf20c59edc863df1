//! Timed entry: accumulate a position in paced chunks, then guard every
//! filled chunk independently.
//!
//! The strategy enters once with a step order over `entry_window`. Each
//! chunk that finishes with fills gets its own stop-loss (at
//! `avg * (1 - max_loss)`) and a scheduled close at `hold_window`, so slow
//! fills do not extend the trade's lifetime.

use chrono::Duration;
use drover_core::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TimedEntryConfig {
    pub symbol: String,
    /// Total position to accumulate.
    pub volume: Decimal,
    /// Chunk size per paced send.
    pub step: Decimal,
    /// Window for the stepped entry.
    pub entry_window: Duration,
    /// Maximum lifetime of each filled chunk before it is closed out.
    pub hold_window: Duration,
    /// Stop distance as a fraction of the chunk's average fill price.
    pub max_loss: Decimal,
    /// Hard per-order sizing limit enforced through the engine hook.
    pub max_order_volume: Decimal,
}

#[derive(Debug)]
pub struct TimedEntry {
    config: TimedEntryConfig,
    entry: Option<RecordId>,
    managed: BTreeSet<OrderId>,
}

impl TimedEntry {
    pub fn new(config: TimedEntryConfig) -> Self {
        Self {
            config,
            entry: None,
            managed: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &TimedEntryConfig {
        &self.config
    }

    pub fn entry_record(&self) -> Option<RecordId> {
        self.entry
    }

    /// Drive one bar: feed the engine, place the entry on the first bar,
    /// and arm exits for chunks that have finished filling since.
    pub fn on_bar<G: Gateway>(
        sup: &mut OrderSupervisor<G, TimedEntry>,
        bar: &Bar,
    ) -> Result<(), SuperviseError> {
        sup.on_bar(bar.clone());
        sup.check_on_period_start(bar)?;

        if sup.strategy().entry.is_none() {
            let config = sup.strategy().config.clone();
            let record = sup.make_step_order(
                OrderCommand::Buy,
                &config.symbol,
                bar.close,
                config.volume,
                config.step,
                config.entry_window,
                Duration::seconds(1),
            )?;
            info!("timed entry: stepping into {} {}", config.volume, config.symbol);
            sup.strategy_mut().entry = Some(record);
        }

        let candidates: Vec<OrderId> = {
            let strategy = sup.strategy();
            match strategy.entry {
                Some(record) => sup
                    .step_record(&strategy.config.symbol, record)
                    .map(|r| {
                        r.orders
                            .filled
                            .iter()
                            .filter(|id| !strategy.managed.contains(*id))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default(),
                None => Vec::new(),
            }
        };

        for id in candidates {
            let config = sup.strategy().config.clone();
            let avg = sup
                .registry()
                .traded_price_avg(&id)
                .or_else(|| sup.pack(&id).map(|p| p.order.price));
            let Some(avg) = avg else {
                continue;
            };
            let stop = avg * (Decimal::ONE - config.max_loss);
            sup.set_auto_exit(&id, Some(stop), None, false)?;
            sup.set_conditional_close(&id, config.hold_window, None)?;
            sup.strategy_mut().managed.insert(id);
        }

        sup.check_on_period_end(bar)?;
        Ok(())
    }
}

impl Strategy for TimedEntry {
    fn on_order_pack(&mut self, pack: &OrderPack) {
        if pack.order.has_fill() {
            debug!(
                "timed entry: {} {} traded {}/{}",
                pack.id, pack.order.status, pack.order.traded_volume, pack.order.total_volume
            );
        }
    }

    fn maximum_order_volume(
        &self,
        _symbol: &str,
        _command: OrderCommand,
        _price: Option<Decimal>,
    ) -> Option<Decimal> {
        Some(self.config.max_order_volume)
    }
}
