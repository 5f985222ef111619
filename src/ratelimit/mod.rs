//! Daily-limit and cooldown checks
//!
//! Both checks are read-only comparisons over state owned by the claim
//! store: the limiter never resets counters or writes timestamps. They are
//! advisory; the atomic check-then-increment that makes a claim safe under
//! concurrency lives in [`crate::stores::ClaimStore::try_claim`].

use chrono::{DateTime, Duration, Utc};

/// Daily limit value meaning "no limit"
pub const UNLIMITED: i64 = -1;

/// Outcome of a daily-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyLimitCheck {
    pub can_claim: bool,
    /// True claimed count, reported even when unlimited (for display)
    pub claimed_today: i64,
}

/// Outcome of a cooldown check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CooldownCheck {
    Ready,
    Waiting { remaining: Duration },
}

/// Compare the persisted claimed-today counter against a daily limit.
///
/// The counter is scoped to the current UTC calendar day; day-boundary
/// rollover is the claim store's concern and has already been applied to
/// `claimed_today` by the time it reaches here.
pub fn check_daily_limit(claimed_today: i64, daily_limit: i64) -> DailyLimitCheck {
    if daily_limit == UNLIMITED {
        return DailyLimitCheck {
            can_claim: true,
            claimed_today,
        };
    }

    DailyLimitCheck {
        can_claim: claimed_today < daily_limit,
        claimed_today,
    }
}

/// Check whether the cooldown window since the last claim has elapsed
pub fn check_cooldown(
    last_claim: Option<DateTime<Utc>>,
    cooldown_hours: i64,
    now: DateTime<Utc>,
) -> CooldownCheck {
    if cooldown_hours <= 0 {
        return CooldownCheck::Ready;
    }

    let Some(last) = last_claim else {
        return CooldownCheck::Ready;
    };

    let window = Duration::hours(cooldown_hours);
    let elapsed = now - last;

    if elapsed < window {
        CooldownCheck::Waiting {
            remaining: window - elapsed,
        }
    } else {
        CooldownCheck::Ready
    }
}
