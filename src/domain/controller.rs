//! Strategy controller: the per-step orchestration point.
//!
//! Sequences indicator update → signal evaluation → quota → portfolio
//! construction → order lifecycle, strictly top to bottom, one snapshot at a
//! time. The host may call exactly two entry points: [`StrategyController::on_snapshot`]
//! and [`StrategyController::on_terminate`].

use chrono::{Duration, NaiveDateTime};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;

use super::engine::IndicatorEngine;
use super::evaluator::SignalEvaluator;
use super::indicator::IndicatorKind;
use super::insight::Insight;
use super::instrument::{Instrument, InstrumentId};
use super::lifecycle::OrderLifecycleManager;
use super::order::{OrderId, OrderStatus, TimeInForce};
use super::quota::InsightQuota;
use super::snapshot::DataSnapshot;
use super::weights::PortfolioConstructor;
use crate::ports::broker_port::BrokerPort;
use crate::ports::insight_port::InsightSink;
use crate::ports::param_port::ParameterPort;

const FAST_SLOT: &str = "fast";
const SLOW_SLOT: &str = "slow";

/// Strategy lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Idle,
    WarmingUp,
    Active,
    Liquidating,
    Terminated,
}

/// Tunables resolved from the host's named-parameter lookup.
#[derive(Debug, Clone)]
pub struct StrategySettings {
    pub fast_period: usize,
    pub slow_period: usize,
    pub max_insights: usize,
    pub insight_period: Duration,
    pub insight_confidence: f64,
    /// Time-in-force attached to rebalance orders.
    pub order_time_in_force: TimeInForce,
}

impl Default for StrategySettings {
    fn default() -> Self {
        StrategySettings {
            fast_period: 5,
            slow_period: 21,
            max_insights: 10,
            insight_period: Duration::days(30),
            insight_confidence: 1.0,
            order_time_in_force: TimeInForce::GoodTilCanceled,
        }
    }
}

impl StrategySettings {
    pub fn from_parameters(params: &dyn ParameterPort) -> Self {
        let defaults = StrategySettings::default();
        StrategySettings {
            fast_period: params.get_int("sma_fast", defaults.fast_period as i64).max(1) as usize,
            slow_period: params.get_int("sma_slow", defaults.slow_period as i64).max(1) as usize,
            max_insights: params
                .get_int("max_insights", defaults.max_insights as i64)
                .max(0) as usize,
            insight_period: Duration::days(params.get_int("insight_period_days", 30).max(1)),
            insight_confidence: params.get_double("insight_confidence", 1.0),
            order_time_in_force: defaults.order_time_in_force,
        }
    }
}

pub struct StrategyController {
    state: StrategyState,
    settings: StrategySettings,
    instruments: BTreeMap<InstrumentId, Instrument>,
    engine: IndicatorEngine,
    evaluators: BTreeMap<InstrumentId, SignalEvaluator>,
    quota: InsightQuota,
    constructor: PortfolioConstructor,
    lifecycle: OrderLifecycleManager,
    liquidation_orders: Vec<OrderId>,
    last_instant: Option<NaiveDateTime>,
    rejected_submissions: usize,
}

impl StrategyController {
    pub fn new(settings: StrategySettings) -> Self {
        let quota = InsightQuota::new(settings.max_insights);
        StrategyController {
            state: StrategyState::Idle,
            settings,
            instruments: BTreeMap::new(),
            engine: IndicatorEngine::new(),
            evaluators: BTreeMap::new(),
            quota,
            constructor: PortfolioConstructor::new(),
            lifecycle: OrderLifecycleManager::new(),
            liquidation_orders: Vec::new(),
            last_instant: None,
            rejected_submissions: 0,
        }
    }

    /// Register an instrument the strategy trades. Sets up its fast/slow
    /// indicator slots and its calendar.
    pub fn register_instrument(&mut self, instrument: Instrument) {
        let id = instrument.id.clone();
        self.engine.register(
            id.clone(),
            FAST_SLOT,
            IndicatorKind::Sma(self.settings.fast_period),
        );
        self.engine.register(
            id.clone(),
            SLOW_SLOT,
            IndicatorKind::Sma(self.settings.slow_period),
        );
        self.evaluators.insert(id.clone(), SignalEvaluator::new());
        self.lifecycle
            .register_instrument(id.clone(), instrument.calendar);
        self.instruments.insert(id, instrument);
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn insights_emitted(&self) -> usize {
        self.quota.emitted()
    }

    pub fn rejected_submissions(&self) -> usize {
        self.rejected_submissions
    }

    pub fn order_count_with_status(&self, status: OrderStatus) -> usize {
        self.lifecycle.count_with_status(status)
    }

    /// Host entry point: process one snapshot to completion.
    pub fn on_snapshot(
        &mut self,
        snapshot: &DataSnapshot,
        broker: &mut dyn BrokerPort,
        insights: &mut dyn InsightSink,
    ) {
        self.last_instant = Some(snapshot.at);

        match self.state {
            StrategyState::Terminated => {
                warn!("snapshot after termination, ignoring");
                return;
            }
            StrategyState::Liquidating => {
                self.finish_liquidation(snapshot.at, broker);
                return;
            }
            StrategyState::Idle => {
                info!("first snapshot received, warming up");
                self.state = StrategyState::WarmingUp;
            }
            StrategyState::WarmingUp | StrategyState::Active => {}
        }

        self.engine.apply(snapshot);

        if self.state == StrategyState::WarmingUp {
            if !self.engine.all_warm() {
                return;
            }
            info!("all indicators warm, strategy active");
            self.state = StrategyState::Active;
        }

        self.step(snapshot, broker, insights);
    }

    /// Host entry point: terminate the strategy. Issues one Immediate
    /// flatten order per instrument with non-zero holdings, then waits for
    /// every flatten order to reach a terminal state.
    ///
    /// The host delivers calls serially, so this always runs at a step
    /// boundary, never mid-step.
    pub fn on_terminate(&mut self, broker: &mut dyn BrokerPort) {
        match self.state {
            StrategyState::Terminated => return,
            StrategyState::Liquidating => {
                let now = self.last_instant.unwrap_or_default();
                self.finish_liquidation(now, broker);
                return;
            }
            _ => {}
        }

        info!("termination requested, liquidating");
        self.state = StrategyState::Liquidating;
        let now = self.last_instant.unwrap_or_default();

        // Stop working whatever is still open before flattening.
        let open: Vec<OrderId> = self.lifecycle.open_orders().map(|o| o.id).collect();
        for id in open {
            broker.cancel(&id);
        }

        for request in self.lifecycle.liquidate(&broker.holdings()) {
            match self.lifecycle.submit(request, now) {
                Ok(order) => {
                    broker.place(&order);
                    self.lifecycle.activate(&order.id);
                    self.liquidation_orders.push(order.id);
                }
                Err(err) => {
                    error!("liquidation order rejected: {err}");
                    self.rejected_submissions += 1;
                }
            }
        }

        self.finish_liquidation(now, broker);
    }

    fn finish_liquidation(&mut self, now: NaiveDateTime, broker: &mut dyn BrokerPort) {
        let transitions = self.lifecycle.tick(now, broker.poll_events());
        for (id, status) in &transitions {
            if *status == OrderStatus::Expired {
                broker.cancel(id);
            }
        }

        let flattened = self.liquidation_orders.iter().all(|id| {
            self.lifecycle
                .order(id)
                .is_some_and(|o| o.status.is_terminal())
        });
        if flattened {
            info!("liquidation complete, strategy terminated");
            self.state = StrategyState::Terminated;
        }
    }

    fn step(
        &mut self,
        snapshot: &DataSnapshot,
        broker: &mut dyn BrokerPort,
        insights: &mut dyn InsightSink,
    ) {
        let now = snapshot.at;

        for (id, evaluator) in self.evaluators.iter_mut() {
            if snapshot.observation(id).is_none() {
                continue;
            }
            let (fast, slow) = match (
                self.engine.value(id, FAST_SLOT),
                self.engine.value(id, SLOW_SLOT),
            ) {
                (Ok(fast), Ok(slow)) => (fast, slow),
                (Err(err), _) | (_, Err(err)) => {
                    debug!("skipping {id}: {err}");
                    continue;
                }
            };

            if let Some(direction) = evaluator.evaluate(fast, slow) {
                info!("{id}: {direction:?} signal (fast {fast:.4} vs slow {slow:.4})");
                let insight = Insight::new(
                    id.clone(),
                    direction,
                    now,
                    self.settings.insight_period,
                )
                .with_confidence(self.settings.insight_confidence);
                if self.quota.try_emit(insight.clone()) {
                    insights.publish(&insight);
                }
            }
        }

        let targets = self.constructor.construct(&self.quota.insights(), now);
        let requests = self.lifecycle.rebalance(
            &broker.holdings(),
            broker.equity(),
            &targets,
            snapshot,
            self.settings.order_time_in_force,
        );
        for request in requests {
            match self.lifecycle.submit(request, now) {
                Ok(order) => {
                    broker.place(&order);
                    self.lifecycle.activate(&order.id);
                }
                Err(err) => {
                    error!("order submission rejected: {err}");
                    self.rejected_submissions += 1;
                }
            }
        }

        let transitions = self.lifecycle.tick(now, broker.poll_events());
        for (id, status) in &transitions {
            if *status == OrderStatus::Expired {
                broker.cancel(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::insight::Direction;
    use crate::domain::order::{Order, OrderEvent};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct TestBroker {
        auto_fill: bool,
        equity: f64,
        positions: HashMap<InstrumentId, f64>,
        placed: Vec<Order>,
        cancelled: Vec<OrderId>,
        events: Vec<OrderEvent>,
    }

    impl TestBroker {
        fn new(auto_fill: bool) -> Self {
            TestBroker {
                auto_fill,
                equity: 100_000.0,
                positions: HashMap::new(),
                placed: Vec::new(),
                cancelled: Vec::new(),
                events: Vec::new(),
            }
        }
    }

    impl BrokerPort for TestBroker {
        fn place(&mut self, order: &Order) {
            self.placed.push(order.clone());
            if self.auto_fill {
                *self
                    .positions
                    .entry(order.instrument.clone())
                    .or_insert(0.0) += order.quantity;
                self.events.push(OrderEvent::Filled {
                    id: order.id,
                    price: 0.0,
                    at: order.submitted_at,
                });
            }
        }

        fn cancel(&mut self, id: &OrderId) {
            self.cancelled.push(*id);
        }

        fn poll_events(&mut self) -> Vec<OrderEvent> {
            std::mem::take(&mut self.events)
        }

        fn holding(&self, instrument: &InstrumentId) -> f64 {
            self.positions.get(instrument).copied().unwrap_or(0.0)
        }

        fn holdings(&self) -> HashMap<InstrumentId, f64> {
            self.positions
                .iter()
                .filter(|(_, q)| **q != 0.0)
                .map(|(id, q)| (id.clone(), *q))
                .collect()
        }

        fn equity(&self) -> f64 {
            self.equity
        }
    }

    #[derive(Default)]
    struct VecSink {
        published: Vec<Insight>,
    }

    impl InsightSink for VecSink {
        fn publish(&mut self, insight: &Insight) {
            self.published.push(insight.clone());
        }
    }

    fn btc() -> InstrumentId {
        InstrumentId::new("BTCUSD")
    }

    fn controller(fast: usize, slow: usize, max_insights: usize) -> StrategyController {
        let settings = StrategySettings {
            fast_period: fast,
            slow_period: slow,
            max_insights,
            ..Default::default()
        };
        let mut controller = StrategyController::new(settings);
        controller.register_instrument(Instrument::crypto("BTCUSD"));
        controller
    }

    fn snap(day: u32, price: f64) -> DataSnapshot {
        let at = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        DataSnapshot::new(at).with_observation(btc(), price, 1.0)
    }

    #[test]
    fn idle_to_warming_up_on_first_snapshot() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        assert_eq!(controller.state(), StrategyState::Idle);
        controller.on_snapshot(&snap(1, 100.0), &mut broker, &mut sink);
        assert_eq!(controller.state(), StrategyState::WarmingUp);
    }

    #[test]
    fn no_signals_while_warming_up() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        // Rising prices would cross fast above slow if evaluation ran.
        controller.on_snapshot(&snap(1, 100.0), &mut broker, &mut sink);
        controller.on_snapshot(&snap(2, 110.0), &mut broker, &mut sink);
        assert_eq!(controller.state(), StrategyState::WarmingUp);
        assert!(sink.published.is_empty());
        assert!(broker.placed.is_empty());
    }

    #[test]
    fn active_once_all_indicators_warm() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut broker, &mut sink);
        }
        assert_eq!(controller.state(), StrategyState::Active);
        // Flat series: fast == slow, no entry.
        assert!(sink.published.is_empty());
    }

    #[test]
    fn cross_above_emits_insight_and_buys() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut broker, &mut sink);
        }
        controller.on_snapshot(&snap(4, 120.0), &mut broker, &mut sink);

        assert_eq!(sink.published.len(), 1);
        assert_eq!(sink.published[0].direction, Direction::Up);
        assert_eq!(broker.placed.len(), 1);
        // Full target weight at 100k equity and price 120.
        assert_relative_eq!(broker.placed[0].quantity, 100_000.0 / 120.0);
    }

    #[test]
    fn no_resubmission_while_still_crossed() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut broker, &mut sink);
        }
        controller.on_snapshot(&snap(4, 120.0), &mut broker, &mut sink);
        assert_eq!(broker.placed.len(), 1);

        // Still crossed at the same price: no new insight, no new order.
        controller.on_snapshot(&snap(5, 120.0), &mut broker, &mut sink);
        assert_eq!(sink.published.len(), 1);
        assert_eq!(broker.placed.len(), 1);
    }

    #[test]
    fn direction_flip_rebalances_to_short() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut broker, &mut sink);
        }
        controller.on_snapshot(&snap(4, 120.0), &mut broker, &mut sink);
        let held = broker.holding(&btc());
        assert!(held > 0.0);

        // Falling prices push fast below slow.
        controller.on_snapshot(&snap(5, 60.0), &mut broker, &mut sink);
        assert_eq!(sink.published.len(), 2);
        assert_eq!(sink.published[1].direction, Direction::Down);
        assert_eq!(broker.placed.len(), 2);
        assert!(broker.placed[1].quantity < 0.0);
        assert!(broker.holding(&btc()) < 0.0);
    }

    #[test]
    fn quota_exhaustion_stops_publication_but_not_the_strategy() {
        let mut controller = controller(2, 3, 1);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut broker, &mut sink);
        }
        controller.on_snapshot(&snap(4, 120.0), &mut broker, &mut sink);
        assert_eq!(sink.published.len(), 1);

        // The flip would emit a second insight, but the quota is spent.
        controller.on_snapshot(&snap(5, 60.0), &mut broker, &mut sink);
        assert_eq!(sink.published.len(), 1);
        assert_eq!(controller.insights_emitted(), 1);
        assert_eq!(controller.state(), StrategyState::Active);
    }

    #[test]
    fn terminate_flattens_and_terminates() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut broker, &mut sink);
        }
        controller.on_snapshot(&snap(4, 120.0), &mut broker, &mut sink);
        let held = broker.holding(&btc());
        assert!(held > 0.0);
        let placed_before = broker.placed.len();

        controller.on_terminate(&mut broker);
        assert_eq!(controller.state(), StrategyState::Terminated);
        assert_eq!(broker.placed.len(), placed_before + 1);

        let flatten = &broker.placed[placed_before];
        assert_eq!(flatten.time_in_force, TimeInForce::Immediate);
        assert_eq!(flatten.tag, "liquidation");
        assert_relative_eq!(flatten.quantity, -held);
        assert_relative_eq!(broker.holding(&btc()), 0.0);
    }

    #[test]
    fn unfilled_flatten_order_expires_and_still_terminates() {
        let mut controller = controller(2, 3, 10);
        let mut filling = TestBroker::new(true);
        let mut sink = VecSink::default();

        for day in 1..=3 {
            controller.on_snapshot(&snap(day, 100.0), &mut filling, &mut sink);
        }
        controller.on_snapshot(&snap(4, 120.0), &mut filling, &mut sink);

        // Broker stops filling before termination.
        let mut stalled = TestBroker::new(false);
        stalled.positions = filling.positions.clone();
        controller.on_terminate(&mut stalled);

        // Immediate flatten expired unfilled; liquidation still completes.
        assert_eq!(controller.state(), StrategyState::Terminated);
        assert_eq!(controller.order_count_with_status(OrderStatus::Expired), 1);
        assert!(!stalled.cancelled.is_empty());
    }

    #[test]
    fn terminate_without_holdings_is_immediate() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);

        controller.on_terminate(&mut broker);
        assert_eq!(controller.state(), StrategyState::Terminated);
        assert!(broker.placed.is_empty());
    }

    #[test]
    fn snapshots_after_termination_are_ignored() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);
        let mut sink = VecSink::default();

        controller.on_terminate(&mut broker);
        assert_eq!(controller.state(), StrategyState::Terminated);

        controller.on_snapshot(&snap(1, 100.0), &mut broker, &mut sink);
        assert_eq!(controller.state(), StrategyState::Terminated);
        assert!(broker.placed.is_empty());
    }

    #[test]
    fn terminate_is_idempotent() {
        let mut controller = controller(2, 3, 10);
        let mut broker = TestBroker::new(true);

        controller.on_terminate(&mut broker);
        controller.on_terminate(&mut broker);
        assert_eq!(controller.state(), StrategyState::Terminated);
        assert!(broker.placed.is_empty());
    }

    #[test]
    fn settings_resolve_from_parameters() {
        use crate::adapters::map_param_adapter::MapParameterAdapter;

        let params = MapParameterAdapter::new()
            .with("sma_fast", 8.0)
            .with("sma_slow", 34.0)
            .with("max_insights", 3.0)
            .with("insight_period_days", 7.0)
            .with("insight_confidence", 0.2);
        let settings = StrategySettings::from_parameters(&params);
        assert_eq!(settings.fast_period, 8);
        assert_eq!(settings.slow_period, 34);
        assert_eq!(settings.max_insights, 3);
        assert_eq!(settings.insight_period, Duration::days(7));
        assert_eq!(settings.insight_confidence, 0.2);
    }

    #[test]
    fn settings_defaults_match_parameter_defaults() {
        use crate::adapters::map_param_adapter::MapParameterAdapter;

        let params = MapParameterAdapter::new();
        let settings = StrategySettings::from_parameters(&params);
        assert_eq!(settings.fast_period, 5);
        assert_eq!(settings.slow_period, 21);
        assert_eq!(settings.max_insights, 10);
        assert_eq!(settings.insight_period, Duration::days(30));
    }
}
