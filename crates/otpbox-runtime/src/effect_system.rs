#![forbid(unsafe_code)]

//! Effect observability.
//!
//! - **Tracing spans**: `effect.command` and `effect.subscription` spans
//!   with structured fields.
//! - **Counters**: monotonic totals of executed commands, started
//!   subscriptions and discarded clipboard reads.

use std::sync::atomic::{AtomicU64, Ordering};
use web_time::Instant;

static EFFECTS_COMMAND_TOTAL: AtomicU64 = AtomicU64::new(0);
static EFFECTS_SUBSCRIPTION_TOTAL: AtomicU64 = AtomicU64::new(0);
static EFFECTS_STALE_READ_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total command effects executed (monotonic counter).
#[must_use]
pub fn effects_command_total() -> u64 {
    EFFECTS_COMMAND_TOTAL.load(Ordering::Relaxed)
}

/// Total subscription effects started (monotonic counter).
#[must_use]
pub fn effects_subscription_total() -> u64 {
    EFFECTS_SUBSCRIPTION_TOTAL.load(Ordering::Relaxed)
}

/// Total clipboard reads discarded after teardown (monotonic counter).
#[must_use]
pub fn effects_stale_read_total() -> u64 {
    EFFECTS_STALE_READ_TOTAL.load(Ordering::Relaxed)
}

/// Execute a command effect inside an `effect.command` span.
pub fn trace_command_effect<F, R>(command_type: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    EFFECTS_COMMAND_TOTAL.fetch_add(1, Ordering::Relaxed);

    let start = Instant::now();
    let _span = tracing::debug_span!(
        "effect.command",
        command_type = %command_type,
        duration_us = tracing::field::Empty,
    )
    .entered();

    let result = f();
    let duration_us = start.elapsed().as_micros() as u64;

    tracing::trace!(
        target: "otpbox.effect",
        command_type = %command_type,
        duration_us = duration_us,
        "command effect completed"
    );

    result
}

/// Record a subscription start.
pub fn record_subscription_start(sub_type: &str, sub_id: u64) {
    EFFECTS_SUBSCRIPTION_TOTAL.fetch_add(1, Ordering::Relaxed);

    let _span = tracing::debug_span!(
        "effect.subscription",
        sub_type = %sub_type,
        active = true,
    )
    .entered();

    tracing::debug!(
        target: "otpbox.effect",
        sub_type = %sub_type,
        sub_id = sub_id,
        active = true,
        "subscription started"
    );
}

/// Record a subscription stop.
pub fn record_subscription_stop(sub_type: &str, sub_id: u64, event_count: u64) {
    let _span = tracing::debug_span!(
        "effect.subscription",
        sub_type = %sub_type,
        event_count = event_count,
        active = false,
    )
    .entered();

    tracing::debug!(
        target: "otpbox.effect",
        sub_type = %sub_type,
        sub_id = sub_id,
        event_count = event_count,
        active = false,
        "subscription stopped"
    );
}

/// Record a clipboard read result discarded because its program is gone.
pub fn record_stale_read() {
    EFFECTS_STALE_READ_TOTAL.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        target: "otpbox.effect",
        "discarding clipboard read that completed after teardown"
    );
}
