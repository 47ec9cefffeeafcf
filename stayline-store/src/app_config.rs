use serde::Deserialize;
use std::env;

use stayline_domain::SweepKind;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineRules,
    #[serde(default)]
    pub sweeps: SweepSchedule,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Engine-level business rules. Every option has a default so the config
/// is constructible in code (tests, embedding) without any config file.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineRules {
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_minutes: i64,
    #[serde(default = "default_no_show_grace")]
    pub no_show_grace_period_hours: i64,
    #[serde(default = "default_stale_pending")]
    pub stale_pending_hours: i64,
    #[serde(default = "default_payment_timeout")]
    pub payment_timeout_minutes: i64,
    /// Pending reservations are cancellable this many hours before the
    /// check-in hour on arrival day
    #[serde(default = "default_unconfirmed_cutoff")]
    pub unconfirmed_cutoff_hours: i64,
    #[serde(default = "default_check_in_hour")]
    pub check_in_hour: u32,
    #[serde(default = "default_true")]
    pub auto_assign_rooms: bool,
    #[serde(default = "default_true")]
    pub auto_mark_no_shows: bool,
    #[serde(default = "default_true")]
    pub auto_confirm_on_payment: bool,
}

/// Cadence per sweep, in seconds. Exact cadence is a deployment
/// parameter, not a correctness requirement.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepSchedule {
    #[serde(default = "default_unconfirmed_seconds")]
    pub unconfirmed_deadline_seconds: u64,
    #[serde(default = "default_hourly")]
    pub overdue_checkout_seconds: u64,
    #[serde(default = "default_hourly")]
    pub arrival_seconds: u64,
    #[serde(default = "default_hourly")]
    pub no_show_seconds: u64,
    #[serde(default = "default_stale_pending_seconds")]
    pub stale_pending_seconds: u64,
    #[serde(default = "default_expired_holds_seconds")]
    pub expired_holds_seconds: u64,
}

impl SweepSchedule {
    pub fn seconds_for(&self, kind: SweepKind) -> u64 {
        match kind {
            SweepKind::UnconfirmedDeadline => self.unconfirmed_deadline_seconds,
            SweepKind::StalePending => self.stale_pending_seconds,
            SweepKind::Arrival => self.arrival_seconds,
            SweepKind::NoShow => self.no_show_seconds,
            SweepKind::OverdueCheckout => self.overdue_checkout_seconds,
            SweepKind::ExpiredHolds => self.expired_holds_seconds,
        }
    }
}

fn default_port() -> u16 { 8080 }
fn default_hold_ttl() -> i64 { 15 }
fn default_no_show_grace() -> i64 { 24 }
fn default_stale_pending() -> i64 { 72 }
fn default_payment_timeout() -> i64 { 30 }
fn default_unconfirmed_cutoff() -> i64 { 3 }
fn default_check_in_hour() -> u32 { 14 }
fn default_true() -> bool { true }
fn default_unconfirmed_seconds() -> u64 { 1800 }
fn default_hourly() -> u64 { 3600 }
fn default_stale_pending_seconds() -> u64 { 21600 }
fn default_expired_holds_seconds() -> u64 { 60 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Default for EngineRules {
    fn default() -> Self {
        Self {
            hold_ttl_minutes: default_hold_ttl(),
            no_show_grace_period_hours: default_no_show_grace(),
            stale_pending_hours: default_stale_pending(),
            payment_timeout_minutes: default_payment_timeout(),
            unconfirmed_cutoff_hours: default_unconfirmed_cutoff(),
            check_in_hour: default_check_in_hour(),
            auto_assign_rooms: default_true(),
            auto_mark_no_shows: default_true(),
            auto_confirm_on_payment: default_true(),
        }
    }
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self {
            unconfirmed_deadline_seconds: default_unconfirmed_seconds(),
            overdue_checkout_seconds: default_hourly(),
            arrival_seconds: default_hourly(),
            no_show_seconds: default_hourly(),
            stale_pending_seconds: default_stale_pending_seconds(),
            expired_holds_seconds: default_expired_holds_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineRules::default(),
            sweeps: SweepSchedule::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Optional file layers; every key has a serde default
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `STAYLINE__ENGINE__HOLD_TTL_MINUTES=30`
            .add_source(config::Environment::with_prefix("STAYLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
