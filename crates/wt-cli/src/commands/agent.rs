//! `wt run`: the foreground tracker loop.
//!
//! One current-thread runtime drives a fixed-interval ticker. Each tick the
//! probes run on the blocking pool under a timeout, and the resulting
//! [`TickInput`] is fed to the [`SegmentTracker`], which writes closed
//! segments straight into the database. The open window is published as a
//! setting for `wt status`. Ctrl-C (and SIGTERM on Unix) stops the loop, even
//! mid-probe, and flushes the open segment.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use wt_core::{
    CurrentActivity, IdleProbe, ProbeError, SegmentTracker, TickInput, TrackerConfig, WindowProbe,
};
use wt_db::Database;
use wt_probe::SystemProbe;

use crate::Config;

/// Setting holding the last time the tracker started.
pub const LAST_STARTED_KEY: &str = "agent.last_started_at";
/// Setting holding the last time the tracker stopped cleanly.
pub const LAST_STOPPED_KEY: &str = "agent.last_stopped_at";
/// Setting holding the open activity of a running tracker, as JSON.
pub const CURRENT_ACTIVITY_KEY: &str = "agent.current_activity";

/// The open activity of a running tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveActivity {
    pub app_name: String,
    pub window_title: String,
    pub since: DateTime<Utc>,
}

impl From<CurrentActivity<'_>> for LiveActivity {
    fn from(current: CurrentActivity<'_>) -> Self {
        Self {
            app_name: current.window.app_name.clone(),
            window_title: current.window.window_title.clone(),
            since: current.since,
        }
    }
}

/// Timing parameters of the tracker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    pub interval: Duration,
    pub idle_threshold: Duration,
    pub probe_timeout: Duration,
}

impl AgentConfig {
    /// Builds the loop configuration, letting command-line seconds override the file.
    pub fn resolve(
        config: &Config,
        interval_secs: Option<u64>,
        idle_threshold_secs: Option<u64>,
    ) -> Result<Self> {
        let agent = Self {
            interval: interval_secs.map_or_else(|| config.tick_interval(), Duration::from_secs),
            idle_threshold: idle_threshold_secs
                .map_or_else(|| config.idle_threshold(), Duration::from_secs),
            probe_timeout: config.probe_timeout(),
        };
        ensure!(!agent.interval.is_zero(), "tick interval must be at least 1 second");
        ensure!(
            !agent.probe_timeout.is_zero(),
            "probe timeout must be at least 1 second"
        );
        Ok(agent)
    }
}

/// Runs the tracker until interrupted.
pub fn run(db: &mut Database, config: AgentConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(track(db, SystemProbe::new(), config, wait_for_shutdown_signal()))
}

/// The tracker loop, generic over the probe and the shutdown trigger.
pub async fn track<P, F>(
    db: &mut Database,
    probe: P,
    config: AgentConfig,
    shutdown: F,
) -> Result<()>
where
    P: IdleProbe + WindowProbe + Clone + Send + 'static,
    F: Future,
{
    db.set_setting(LAST_STARTED_KEY, &Utc::now().to_rfc3339())
        .context("failed to record start time")?;
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        idle_threshold_secs = config.idle_threshold.as_secs(),
        "tracker started"
    );

    let mut tracker = SegmentTracker::new(TrackerConfig {
        idle_threshold: config.idle_threshold,
    });
    let mut published: Option<LiveActivity> = None;
    // Forces the first write, which clears a value left by a crashed run.
    let mut publish_pending = true;
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        let live = tracker.current().map(LiveActivity::from);
        if publish_pending || live != published {
            match publish(db, live.as_ref()) {
                Ok(()) => {
                    published = live;
                    publish_pending = false;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to publish current activity");
                    publish_pending = true;
                }
            }
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let now = timestamp();
        let input = tokio::select! {
            _ = &mut shutdown => break,
            input = sample(&probe, &tracker, config.probe_timeout) => input,
        };
        let Some(input) = input else {
            continue;
        };
        if let Err(err) = tracker.tick(now, input, db) {
            tracing::warn!(error = %err, "failed to save activity, retrying next tick");
        }
    }
    tracing::info!("shutdown requested");

    if let Err(err) = tracker.shutdown(timestamp(), db) {
        tracing::error!(error = %err, "failed to save final activity");
    }
    if let Err(err) = publish(db, None) {
        tracing::warn!(error = %err, "failed to clear current activity");
    }
    db.set_setting(LAST_STOPPED_KEY, &Utc::now().to_rfc3339())
        .context("failed to record stop time")?;
    tracing::info!("tracker stopped");
    Ok(())
}

/// The current instant at the precision activities are stored with.
fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Writes or clears the published current activity.
fn publish(db: &mut Database, live: Option<&LiveActivity>) -> Result<()> {
    match live {
        Some(live) => db.set_setting(CURRENT_ACTIVITY_KEY, &serde_json::to_string(live)?)?,
        None => {
            db.delete_setting(CURRENT_ACTIVITY_KEY)?;
        }
    }
    Ok(())
}

/// Samples the probes for one tick. `None` means the tick is skipped.
async fn sample<P>(probe: &P, tracker: &SegmentTracker, timeout: Duration) -> Option<TickInput>
where
    P: IdleProbe + WindowProbe + Clone + Send + 'static,
{
    let idle_for = match run_probe(probe.clone(), "idle", timeout, |p| p.sample_idle_duration()).await
    {
        Ok(idle_for) => idle_for,
        Err(err) => {
            tracing::warn!(error = %err, "idle probe failed, skipping tick");
            return None;
        }
    };

    if tracker.is_idle(idle_for) {
        return Some(TickInput::Idle);
    }

    let window = match run_probe(probe.clone(), "window", timeout, |p| p.sample_active_window())
        .await
    {
        Ok(window) => Some(window),
        Err(err) => {
            tracing::warn!(error = %err, "window probe failed");
            None
        }
    };
    Some(TickInput::Active { window })
}

/// Runs a blocking probe call on the blocking pool, bounded by `timeout`.
async fn run_probe<P, T, F>(
    probe: P,
    name: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, ProbeError>
where
    P: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&P) -> Result<T, ProbeError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || call(&probe));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ProbeError::Command {
            command: name,
            message: join_err.to_string(),
        }),
        Err(_) => Err(ProbeError::Timeout {
            probe: name,
            timeout,
        }),
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
