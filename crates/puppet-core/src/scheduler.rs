//! Naturalistic post scheduling.
//!
//! Every agent has at most one pending "next post" timestamp. The
//! [`Scheduler`] keeps them in a binary heap ordered by due time; setting a
//! new timestamp for an agent supersedes the old one (stale heap entries are
//! skipped lazily when popped) and cancelling removes it.
//!
//! Timestamps come from [`next_post_time`]: a uniform draw between the
//! agent's minimum and maximum interval, pulled slightly earlier when it
//! lands in a peak hour, plus a small positive jitter so agents never post
//! on a mechanical period.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use puppet_agents::EffectiveBehavior;
use puppet_types::AgentId;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Jitter and fallback parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Largest pull-forward applied when the draw lands in a peak hour.
    #[serde(default = "default_peak_jitter_max_minutes")]
    pub peak_jitter_max_minutes: f64,

    /// Largest positive jitter added to every draw.
    #[serde(default = "default_positive_jitter_max_minutes")]
    pub positive_jitter_max_minutes: f64,

    /// Shortest retry delay after a failed attempt.
    #[serde(default = "default_fallback_min_minutes")]
    pub fallback_min_minutes: u32,

    /// Longest retry delay after repeated failures.
    #[serde(default = "default_fallback_max_minutes")]
    pub fallback_max_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            peak_jitter_max_minutes: default_peak_jitter_max_minutes(),
            positive_jitter_max_minutes: default_positive_jitter_max_minutes(),
            fallback_min_minutes: default_fallback_min_minutes(),
            fallback_max_minutes: default_fallback_max_minutes(),
        }
    }
}

const fn default_peak_jitter_max_minutes() -> f64 {
    10.0
}

const fn default_positive_jitter_max_minutes() -> f64 {
    5.0
}

const fn default_fallback_min_minutes() -> u32 {
    10
}

const fn default_fallback_max_minutes() -> u32 {
    60
}

// ---------------------------------------------------------------------------
// Timestamp computation
// ---------------------------------------------------------------------------

/// Compute the next autonomous post time for an agent.
///
/// The interval is drawn uniformly from `[min_hours, max_hours]`. If the
/// resulting UTC hour is a peak hour the interval shrinks by up to
/// `peak_jitter_max_minutes`, but never below `min_hours`. A positive jitter
/// of up to `positive_jitter_max_minutes` is always added, so
/// `min_hours <= T - now <= max_hours + positive jitter`.
pub fn next_post_time<R: Rng + ?Sized>(
    behavior: &EffectiveBehavior,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> DateTime<Utc> {
    let min_hours = non_negative(behavior.min_hours_between_posts);
    let max_hours = non_negative(behavior.max_hours_between_posts).max(min_hours);

    let floor = hours(min_hours);
    let mut interval = hours(rng.random_range(min_hours..=max_hours));

    let candidate = now.checked_add_signed(interval).unwrap_or(now);
    if behavior.peak_posting_hours.contains(&candidate.hour()) {
        let pull = minutes(rng.random_range(0.0..=non_negative(config.peak_jitter_max_minutes)));
        interval = interval
            .checked_sub(&pull)
            .unwrap_or(floor)
            .max(floor);
    }

    let jitter = minutes(rng.random_range(0.0..=non_negative(config.positive_jitter_max_minutes)));
    interval = interval.checked_add(&jitter).unwrap_or(interval);

    now.checked_add_signed(interval).unwrap_or(now)
}

/// Retry delay after `failures` consecutive failed attempts.
///
/// Grows as `2^failures` minutes, clamped to
/// `[fallback_min_minutes, fallback_max_minutes]`.
pub fn fallback_delay(failures: u32, config: &SchedulerConfig) -> TimeDelta {
    let floor = i64::from(config.fallback_min_minutes);
    let ceiling = i64::from(config.fallback_max_minutes).max(floor);
    let grown = 2_i64.checked_pow(failures).unwrap_or(i64::MAX);
    TimeDelta::minutes(grown.clamp(floor, ceiling))
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

pub(crate) fn hours(value: f64) -> TimeDelta {
    TimeDelta::milliseconds(to_millis(value * 3_600_000.0))
}

fn minutes(value: f64) -> TimeDelta {
    TimeDelta::milliseconds(to_millis(value * 60_000.0))
}

/// Round a finite, non-negative millisecond count into range for `TimeDelta`.
#[allow(clippy::cast_possible_truncation)]
fn to_millis(value: f64) -> i64 {
    // Ten years of milliseconds keeps every interval far from overflow.
    const LIMIT: f64 = 315_360_000_000.0;
    if value.is_finite() {
        value.round().clamp(0.0, LIMIT) as i64
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    due: DateTime<Utc>,
    generation: u64,
    agent: AgentId,
}

/// Priority queue of pending post times, at most one per agent.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    pending: BTreeMap<AgentId, (DateTime<Utc>, u64)>,
    next_generation: u64,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent's next post time, replacing any pending one.
    pub fn schedule_at(&mut self, agent: &AgentId, due: DateTime<Utc>) {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.pending.insert(agent.clone(), (due, generation));
        self.queue.push(Reverse(Entry {
            due,
            generation,
            agent: agent.clone(),
        }));
    }

    /// Drop the agent's pending post time. Returns it, if there was one.
    pub fn cancel(&mut self, agent: &AgentId) -> Option<DateTime<Utc>> {
        self.pending.remove(agent).map(|(due, _)| due)
    }

    /// The agent's pending post time.
    pub fn pending(&self, agent: &AgentId) -> Option<DateTime<Utc>> {
        self.pending.get(agent).map(|(due, _)| *due)
    }

    /// Number of agents with a pending post time.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no agent has a pending post time.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest pending post time.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.pending.values().map(|(due, _)| *due).min()
    }

    /// Remove and return every agent whose post time is at or before `now`,
    /// earliest first. Their pending timestamps are cleared.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<AgentId> {
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= now)
        {
            let Some(Reverse(entry)) = self.queue.pop() else {
                break;
            };
            let current = self
                .pending
                .get(&entry.agent)
                .is_some_and(|(_, generation)| *generation == entry.generation);
            if current {
                self.pending.remove(&entry.agent);
                due.push(entry.agent);
            }
        }
        due
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use puppet_types::BehaviorConfig;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn behavior(min: f64, max: f64, peaks: Vec<u32>) -> EffectiveBehavior {
        let mut config = BehaviorConfig::default();
        config.post_frequency.min_hours_between_posts = min;
        config.post_frequency.max_hours_between_posts = max;
        config.post_frequency.peak_posting_hours = peaks;
        EffectiveBehavior::from_config(&config)
    }

    #[test]
    fn fresh_schedule_respects_bounds() {
        let mut rng = SmallRng::seed_from_u64(42);
        let config = SchedulerConfig::default();
        // Every hour is a peak hour, so the pull-forward is always exercised.
        let behavior = behavior(2.0, 4.0, (0..24).collect());
        let now = Utc::now();
        let lower = TimeDelta::hours(2);
        let upper = TimeDelta::hours(4) + TimeDelta::minutes(5);
        for _ in 0..1_000 {
            let elapsed = next_post_time(&behavior, &config, now, &mut rng) - now;
            assert!(elapsed >= lower, "{elapsed} below minimum");
            assert!(elapsed <= upper, "{elapsed} above maximum");
        }
    }

    #[test]
    fn equal_bounds_still_jitter() {
        let mut rng = SmallRng::seed_from_u64(1);
        let behavior = behavior(1.0, 1.0, Vec::new());
        let now = Utc::now();
        let times: Vec<DateTime<Utc>> = (0..20)
            .map(|_| next_post_time(&behavior, &SchedulerConfig::default(), now, &mut rng))
            .collect();
        assert!(times.iter().any(|t| *t != times[0]));
    }

    #[test]
    fn fallback_grows_and_is_bounded() {
        let config = SchedulerConfig::default();
        assert_eq!(fallback_delay(0, &config), TimeDelta::minutes(10));
        assert_eq!(fallback_delay(4, &config), TimeDelta::minutes(16));
        assert_eq!(fallback_delay(5, &config), TimeDelta::minutes(32));
        assert_eq!(fallback_delay(40, &config), TimeDelta::minutes(60));
        assert_eq!(fallback_delay(u32::MAX, &config), TimeDelta::minutes(60));
    }

    #[test]
    fn one_pending_timestamp_per_agent() {
        let mut scheduler = Scheduler::new();
        let agent = AgentId::new("a");
        let now = Utc::now();
        scheduler.schedule_at(&agent, now + TimeDelta::minutes(5));
        scheduler.schedule_at(&agent, now + TimeDelta::minutes(30));
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pending(&agent), Some(now + TimeDelta::minutes(30)));

        // The superseded entry is skipped.
        assert!(scheduler.pop_due(now + TimeDelta::minutes(10)).is_empty());
        assert_eq!(scheduler.pop_due(now + TimeDelta::minutes(31)), vec![agent.clone()]);
        assert!(scheduler.pending(&agent).is_none());
    }

    #[test]
    fn cancel_removes_pending_entry() {
        let mut scheduler = Scheduler::new();
        let agent = AgentId::new("a");
        let now = Utc::now();
        scheduler.schedule_at(&agent, now);
        assert_eq!(scheduler.cancel(&agent), Some(now));
        assert!(scheduler.pop_due(now + TimeDelta::hours(1)).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn due_agents_pop_in_time_order() {
        let mut scheduler = Scheduler::new();
        let now = Utc::now();
        scheduler.schedule_at(&AgentId::new("late"), now + TimeDelta::minutes(2));
        scheduler.schedule_at(&AgentId::new("early"), now + TimeDelta::minutes(1));
        scheduler.schedule_at(&AgentId::new("future"), now + TimeDelta::hours(2));
        assert_eq!(scheduler.next_due(), Some(now + TimeDelta::minutes(1)));
        let due = scheduler.pop_due(now + TimeDelta::minutes(3));
        assert_eq!(due, vec![AgentId::new("early"), AgentId::new("late")]);
        assert_eq!(scheduler.len(), 1);
    }
}
