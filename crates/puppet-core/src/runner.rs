//! The driver loop.
//!
//! [`run_engine`] owns two timers: the scheduler tick, which pops due agents
//! and spawns their post creation, and the mention poll, which hands one
//! agent's new mentions to the reaction pipeline. Neither timer awaits a
//! collaborator call; all such work runs in spawned tasks. The loop ends when
//! [`RunControl::request_stop`] is called.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::control::RunControl;
use crate::engine::Engine;
use crate::poller::MentionPoller;

/// What the loop did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Scheduler ticks executed.
    pub ticks: u64,
    /// Scheduled posts spawned.
    pub posts_spawned: u64,
    /// Mention polls started.
    pub polls: u64,
}

/// Drive the engine until a stop is requested.
pub async fn run_engine(
    engine: Arc<Engine>,
    driver: &DriverConfig,
    control: Arc<RunControl>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let poller = Arc::new(Mutex::new(MentionPoller::new()));

    let mut tick_timer =
        tokio::time::interval(Duration::from_secs(driver.tick_interval_secs.max(1)));
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poll_timer =
        tokio::time::interval(Duration::from_secs(driver.mention_poll_interval_secs.max(1)));
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        tick_interval_secs = driver.tick_interval_secs,
        mention_poll_interval_secs = driver.mention_poll_interval_secs,
        "Engine loop starting"
    );

    loop {
        tokio::select! {
            () = control.stopped() => break,
            _ = tick_timer.tick() => {
                if control.is_paused() {
                    continue;
                }
                let spawned = engine.tick(Utc::now()).await;
                summary.ticks = summary.ticks.saturating_add(1);
                summary.posts_spawned = summary
                    .posts_spawned
                    .saturating_add(u64::try_from(spawned.len()).unwrap_or(u64::MAX));
            }
            _ = poll_timer.tick() => {
                if control.is_paused() {
                    continue;
                }
                // Skip this turn if the previous poll is still running.
                let Ok(mut guard) = Arc::clone(&poller).try_lock_owned() else {
                    debug!("Previous mention poll still running");
                    continue;
                };
                let engine = Arc::clone(&engine);
                summary.polls = summary.polls.saturating_add(1);
                tokio::spawn(async move {
                    guard.poll_next(&engine).await;
                });
            }
        }
    }

    info!(
        ticks = summary.ticks,
        posts_spawned = summary.posts_spawned,
        polls = summary.polls,
        "Engine loop stopped"
    );
    summary
}
