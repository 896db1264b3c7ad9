use std::time::Instant;

use bevy::prelude::*;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct Timing(Option<Instant>);

impl Timing {
    #[inline]
    pub fn start() -> Self {
        #[cfg(feature = "perf_timing")]
        {
            Self(Some(Instant::now()))
        }
        #[cfg(not(feature = "perf_timing"))]
        {
            Self(None)
        }
    }

    #[inline]
    pub fn ms(&self) -> f32 {
        self.0
            .map(|t| t.elapsed().as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Milliseconds spent in the movement systems during their last run.
#[derive(Debug, Default, Resource)]
pub struct PerfTimings {
    pub handle_messages_ms: f32,
    pub input_collect_ms: f32,
    pub net_apply_ms: f32,
    pub walk_tick_ms: f32,
}

#[derive(Resource)]
pub struct TimingReport(pub Timer);

impl Default for TimingReport {
    fn default() -> Self {
        Self(Timer::from_seconds(5.0, TimerMode::Repeating))
    }
}

pub fn report_timings(time: Res<Time>, mut report: ResMut<TimingReport>, timings: Res<PerfTimings>) {
    if !report.0.tick(time.delta()).just_finished() {
        return;
    }
    debug!(
        handle_messages_ms = timings.handle_messages_ms,
        input_collect_ms = timings.input_collect_ms,
        net_apply_ms = timings.net_apply_ms,
        walk_tick_ms = timings.walk_tick_ms,
        "movement timings"
    );
}
