//! Adaptive polling interval

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

const MINUTE: u64 = 60;

/// Scheduler options
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// User-configured polling interval
    pub base_interval: Duration,

    /// Consecutive system failures tolerated before slowing down
    pub system_error_threshold: u32,

    /// Upper bound of the system error interval
    pub system_error_cap: Duration,

    /// Minimum interval while the remote rate limit is hit
    pub rate_limited_interval: Duration,

    /// Interval while every mower is switched off
    pub all_off_interval: Duration,

    /// Interval during night hours
    pub night_interval: Duration,

    /// First night hour (local time)
    pub night_start_hour: u32,

    /// Last night hour (local time), inclusive
    pub night_end_hour: u32,

    /// Delay of the status refresh following a command
    pub quick_refresh: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(MINUTE),
            system_error_threshold: 5,
            system_error_cap: Duration::from_secs(12 * 60 * MINUTE),
            rate_limited_interval: Duration::from_secs(60 * MINUTE),
            all_off_interval: Duration::from_secs(60 * MINUTE),
            night_interval: Duration::from_secs(180 * MINUTE),
            night_start_hour: 22,
            night_end_hour: 5,
            quick_refresh: Duration::from_secs(30),
        }
    }
}

impl SchedulerOptions {
    /// Default options with a base interval given in (possibly fractional) minutes
    pub fn with_interval_minutes(minutes: f64) -> Self {
        Self {
            base_interval: Duration::from_secs_f64(minutes.max(0.0) * MINUTE as f64),
            ..Default::default()
        }
    }

    fn is_night(&self, local_hour: u32) -> bool {
        local_hour >= self.night_start_hour || local_hour <= self.night_end_hour
    }
}

/// Polling regime, logged on every transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Regime {
    #[default]
    Normal,
    Night,
    RateLimited,
    AllOff,
    SystemError,
}

/// Outcome of one interval selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Regime(Regime),
    /// Temporary speed-up while a mower returns to its station
    HomingBoost,
}

/// Conditions competing for the next interval
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals {
    pub system_failures: u32,
    pub rate_limited: bool,
    pub all_off: bool,
    pub any_going_home: bool,
}

/// Select the next interval; the first matching condition wins
pub fn next_interval(options: &SchedulerOptions, signals: &Signals, local_hour: u32) -> (Cadence, Duration) {
    if signals.system_failures > options.system_error_threshold {
        let scaled = options.base_interval.saturating_mul(signals.system_failures);
        return (
            Cadence::Regime(Regime::SystemError),
            scaled.min(options.system_error_cap),
        );
    }

    if signals.rate_limited {
        return (
            Cadence::Regime(Regime::RateLimited),
            options.rate_limited_interval.max(options.base_interval),
        );
    }

    if signals.all_off {
        return (Cadence::Regime(Regime::AllOff), options.all_off_interval);
    }

    if signals.any_going_home {
        return (Cadence::HomingBoost, options.base_interval / 2);
    }

    if options.is_night(local_hour) {
        return (Cadence::Regime(Regime::Night), options.night_interval);
    }

    (Cadence::Regime(Regime::Normal), options.base_interval)
}

#[derive(Debug)]
struct SchedulerState {
    regime: Regime,
    next_due: Instant,
}

/// Tracks the active regime and the next polling deadline
#[derive(Debug)]
pub struct AdaptiveScheduler {
    options: SchedulerOptions,
    state: Mutex<SchedulerState>,
}

impl AdaptiveScheduler {
    /// Create a scheduler whose first tick is one base interval away
    pub fn new(options: SchedulerOptions) -> Self {
        let next_due = Instant::now() + options.base_interval;
        Self {
            options,
            state: Mutex::new(SchedulerState {
                regime: Regime::Normal,
                next_due,
            }),
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn regime(&self) -> Regime {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).regime
    }

    /// Whether the polling deadline has passed
    pub fn is_due(&self) -> bool {
        Instant::now() >= self.state.lock().unwrap_or_else(|e| e.into_inner()).next_due
    }

    /// Recompute the interval and arm the next deadline
    pub fn reschedule(&self, signals: &Signals, local_hour: u32) -> Duration {
        let (cadence, interval) = next_interval(&self.options, signals, local_hour);
        let minutes = interval.as_secs_f64() / MINUTE as f64;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.next_due = Instant::now() + interval;

        match cadence {
            Cadence::HomingBoost => {
                debug!("Increasing update speed to {} minutes as a mower is going home", minutes);
            }
            Cadence::Regime(regime) if regime != state.regime => {
                state.regime = regime;
                match regime {
                    Regime::SystemError => info!(
                        "Reduce status update speed to {} minutes because of too many errors from the mower cloud",
                        minutes
                    ),
                    Regime::RateLimited => info!(
                        "Reduce status update speed to {} minutes as the API limits are reached",
                        minutes
                    ),
                    Regime::AllOff => info!(
                        "Reduce status update speed to {} minutes as all mowers are off",
                        minutes
                    ),
                    Regime::Night => info!(
                        "Reduce status update speed to {} minutes during nighttime hours",
                        minutes
                    ),
                    Regime::Normal => info!("Re-establish normal update speed to {} minutes", minutes),
                }
            }
            Cadence::Regime(_) => {}
        }

        interval
    }

    /// Bring the next deadline forward so a command's effect shows up quickly
    pub fn request_quick_refresh(&self) {
        let quick = Instant::now() + self.options.quick_refresh;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if quick < state.next_due {
            state.next_due = quick;
        }
    }
}
