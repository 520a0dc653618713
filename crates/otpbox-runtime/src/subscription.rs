#![forbid(unsafe_code)]

//! Subscription system for periodic event sources.
//!
//! Subscriptions provide a declarative way to receive periodic messages.
//! The runtime manages their lifecycles based on what the model declares as
//! active.
//!
//! # How it works
//!
//! 1. `Model::subscriptions()` returns the set of active subscriptions
//! 2. After each `update()`, the runtime compares active vs previous subscriptions
//! 3. New subscriptions are started, removed ones are stopped
//! 4. Due subscriptions produce messages that are routed through `Model::update()`
//!
//! Time is virtual: the runtime advances the clock and asks the manager which
//! subscription fires next, so poll loops are deterministic under test.

use std::collections::HashSet;
use std::time::Duration;

use crate::effect_system::{record_subscription_start, record_subscription_stop};

/// A unique identifier for a subscription.
///
/// Used by the runtime to track which subscriptions are active and
/// to deduplicate subscriptions across update cycles.
pub type SubId = u64;

/// A subscription produces messages at a fixed period.
pub trait Subscription<M: Send + 'static>: Send {
    /// Unique identifier for deduplication.
    ///
    /// Subscriptions with the same ID are considered identical.
    /// The runtime uses this to avoid restarting unchanged subscriptions.
    fn id(&self) -> SubId;

    /// Period between messages.
    fn interval(&self) -> Duration;

    /// Produce the message for one firing.
    fn fire(&self) -> M;

    /// Short label for tracing.
    fn kind(&self) -> &'static str {
        "subscription"
    }
}

/// A subscription that fires at a fixed interval.
///
/// # Example
///
/// ```ignore
/// fn subscriptions(&self) -> Vec<Box<dyn Subscription<Msg>>> {
///     vec![Box::new(Every::new(Duration::from_secs(2), || Msg::PollClipboard))]
/// }
/// ```
pub struct Every<M: Send + 'static> {
    id: SubId,
    interval: Duration,
    make_msg: Box<dyn Fn() -> M + Send + Sync>,
}

impl<M: Send + 'static> Every<M> {
    /// Create a tick subscription with the given interval and message factory.
    pub fn new(interval: Duration, make_msg: impl Fn() -> M + Send + Sync + 'static) -> Self {
        // Stable ID from the interval so redeclaring the same tick keeps it running
        let id = interval.as_nanos() as u64 ^ 0x5449_434B;
        Self {
            id,
            interval,
            make_msg: Box::new(make_msg),
        }
    }

    /// Create a tick subscription with an explicit ID.
    pub fn with_id(
        id: SubId,
        interval: Duration,
        make_msg: impl Fn() -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            interval,
            make_msg: Box::new(make_msg),
        }
    }
}

impl<M: Send + 'static> Subscription<M> for Every<M> {
    fn id(&self) -> SubId {
        self.id
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn fire(&self) -> M {
        (self.make_msg)()
    }

    fn kind(&self) -> &'static str {
        "every"
    }
}

/// A running subscription and its next deadline.
struct RunningSubscription<M: Send + 'static> {
    sub: Box<dyn Subscription<M>>,
    next_due: Duration,
    fired: u64,
}

impl<M: Send + 'static> RunningSubscription<M> {
    fn stop(self) {
        record_subscription_stop(self.sub.kind(), self.sub.id(), self.fired);
    }
}

/// Manages the lifecycle of subscriptions for a program.
pub(crate) struct SubscriptionManager<M: Send + 'static> {
    active: Vec<RunningSubscription<M>>,
}

impl<M: Send + 'static> SubscriptionManager<M> {
    pub(crate) fn new() -> Self {
        Self { active: Vec::new() }
    }

    /// Update the set of active subscriptions at virtual time `now`.
    ///
    /// - Starts subscriptions that are new (ID not in active set); the first
    ///   firing is one interval after `now`
    /// - Stops subscriptions that are no longer declared
    /// - Leaves unchanged subscriptions running on their existing schedule
    pub(crate) fn reconcile(&mut self, subscriptions: Vec<Box<dyn Subscription<M>>>, now: Duration) {
        let new_ids: HashSet<SubId> = subscriptions.iter().map(|s| s.id()).collect();

        let mut remaining = Vec::new();
        for running in self.active.drain(..) {
            if new_ids.contains(&running.sub.id()) {
                remaining.push(running);
            } else {
                running.stop();
            }
        }
        self.active = remaining;

        let mut active_ids: HashSet<SubId> = self.active.iter().map(|r| r.sub.id()).collect();
        for sub in subscriptions {
            let id = sub.id();
            if !active_ids.insert(id) {
                continue;
            }
            if sub.interval().is_zero() {
                tracing::warn!(target: "otpbox.effect", sub_id = id, "ignoring zero-interval subscription");
                continue;
            }
            record_subscription_start(sub.kind(), id);
            let next_due = now + sub.interval();
            self.active.push(RunningSubscription {
                sub,
                next_due,
                fired: 0,
            });
        }
    }

    /// Earliest deadline among running subscriptions.
    pub(crate) fn next_due(&self) -> Option<Duration> {
        self.active.iter().map(|r| r.next_due).min()
    }

    /// Fire the earliest subscription due at or before `now`.
    ///
    /// Deadlines missed up to `horizon` are merged into this one firing; the
    /// next deadline is the first one after `horizon` on the original phase.
    pub(crate) fn fire_due(&mut self, now: Duration, horizon: Duration) -> Option<M> {
        let running = self
            .active
            .iter_mut()
            .filter(|r| r.next_due <= now)
            .min_by_key(|r| r.next_due)?;
        let interval = running.sub.interval();
        let behind = horizon.saturating_sub(running.next_due);
        let skipped = behind.as_nanos() / interval.as_nanos();
        // Remainder is below `interval`, which fits in u64 nanoseconds.
        let phase = Duration::from_nanos(
            u64::try_from(behind.as_nanos() % interval.as_nanos()).unwrap_or(u64::MAX),
        );
        running.next_due = running.next_due.max(horizon) + interval.saturating_sub(phase);
        if skipped > 0 {
            tracing::debug!(
                target: "otpbox.effect",
                sub_id = running.sub.id(),
                skipped = u64::try_from(skipped).unwrap_or(u64::MAX),
                "merged missed subscription deadlines"
            );
        }
        running.fired += 1;
        Some(running.sub.fire())
    }

    /// Number of running subscriptions.
    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    /// Stop all running subscriptions.
    pub(crate) fn stop_all(&mut self) {
        for running in self.active.drain(..) {
            running.stop();
        }
    }
}

impl<M: Send + 'static> Drop for SubscriptionManager<M> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestMsg {
        Tick,
        Value(i32),
    }

    fn every(id: SubId, ms: u64, msg: TestMsg) -> Box<dyn Subscription<TestMsg>> {
        Box::new(Every::with_id(id, Duration::from_millis(ms), move || {
            msg.clone()
        }))
    }

    #[test]
    fn every_subscription_uses_stable_id() {
        let sub1 = Every::<TestMsg>::new(Duration::from_secs(2), || TestMsg::Tick);
        let sub2 = Every::<TestMsg>::new(Duration::from_secs(2), || TestMsg::Tick);
        assert_eq!(sub1.id(), sub2.id());
    }

    #[test]
    fn every_subscription_different_intervals_different_ids() {
        let sub1 = Every::<TestMsg>::new(Duration::from_secs(1), || TestMsg::Tick);
        let sub2 = Every::<TestMsg>::new(Duration::from_secs(2), || TestMsg::Tick);
        assert_ne!(sub1.id(), sub2.id());
    }

    #[test]
    fn first_firing_is_one_interval_after_start() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(vec![every(1, 2000, TestMsg::Tick)], Duration::from_millis(500));
        assert_eq!(mgr.next_due(), Some(Duration::from_millis(2500)));
        assert_eq!(mgr.fire_due(Duration::from_millis(2499), Duration::from_millis(2499)), None);
        assert_eq!(mgr.fire_due(Duration::from_millis(2500), Duration::from_millis(2500)), Some(TestMsg::Tick));
        assert_eq!(mgr.next_due(), Some(Duration::from_millis(4500)));
    }

    #[test]
    fn dedupes_duplicate_ids() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(
            vec![every(7, 10, TestMsg::Value(1)), every(7, 10, TestMsg::Value(2))],
            Duration::ZERO,
        );
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.fire_due(Duration::from_millis(10), Duration::from_millis(10)), Some(TestMsg::Value(1)));
    }

    #[test]
    fn keeps_unchanged_schedule() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(vec![every(50, 100, TestMsg::Tick)], Duration::ZERO);
        mgr.reconcile(vec![every(50, 100, TestMsg::Tick)], Duration::from_millis(60));
        assert_eq!(mgr.next_due(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn stops_removed() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(vec![every(99, 5, TestMsg::Tick)], Duration::ZERO);
        mgr.reconcile(vec![], Duration::from_millis(1));
        assert_eq!(mgr.len(), 0);
        assert_eq!(mgr.next_due(), None);
        assert_eq!(mgr.fire_due(Duration::from_secs(1), Duration::from_secs(1)), None);
    }

    #[test]
    fn earliest_due_fires_first() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(
            vec![every(1, 30, TestMsg::Value(1)), every(2, 20, TestMsg::Value(2))],
            Duration::ZERO,
        );
        let now = Duration::from_millis(30);
        assert_eq!(mgr.fire_due(now, now), Some(TestMsg::Value(2)));
        assert_eq!(mgr.fire_due(now, now), Some(TestMsg::Value(1)));
        assert_eq!(mgr.fire_due(now, now), None);
    }

    #[test]
    fn missed_deadlines_fire_once() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(vec![every(1, 2000, TestMsg::Tick)], Duration::ZERO);
        let horizon = Duration::from_secs(61);
        assert_eq!(mgr.fire_due(Duration::from_secs(2), horizon), Some(TestMsg::Tick));
        assert_eq!(mgr.fire_due(horizon, horizon), None);
        assert_eq!(mgr.next_due(), Some(Duration::from_secs(62)));
    }

    #[test]
    fn huge_jump_keeps_phase() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(vec![every(1, 2000, TestMsg::Tick)], Duration::from_millis(500));
        let horizon = Duration::from_secs(30 * 24 * 3600);
        assert_eq!(mgr.fire_due(horizon, horizon), Some(TestMsg::Tick));
        assert_eq!(mgr.fire_due(horizon, horizon), None);
        assert_eq!(mgr.next_due(), Some(horizon + Duration::from_millis(500)));
    }

    #[test]
    fn zero_interval_is_ignored() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(vec![every(3, 0, TestMsg::Tick)], Duration::ZERO);
        assert_eq!(mgr.len(), 0);
    }

    #[test]
    fn stop_all_clears() {
        let mut mgr = SubscriptionManager::new();
        mgr.reconcile(
            vec![every(1, 5, TestMsg::Value(1)), every(2, 5, TestMsg::Value(2))],
            Duration::ZERO,
        );
        mgr.stop_all();
        assert_eq!(mgr.len(), 0);
    }
}
