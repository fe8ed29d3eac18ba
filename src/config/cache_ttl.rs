//! Per-Dataset Cache TTL Strategy
//!
//! TTLs are data-type-specific: work-in-progress figures churn constantly
//! and cache for minutes, while external marketing metrics are expensive
//! to fetch and cache for an hour. On top of the base TTLs, a small set of
//! volume and time-of-day rules stretch or shrink the window (large
//! result sets, overnight quiet periods, business-hours churn).
//!
//! The hour of day is an explicit argument to [`CacheTtlConfig::optimal_ttl`]
//! so the policy is testable; [`CacheTtlConfig::optimal_ttl_now`] supplies
//! the local wall-clock hour.

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::info;

use crate::errors::{HelixError, HelixResult};

/// Cached dataset families, each with its own volatility profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    /// Work-in-progress figures; high volatility.
    Wip,
    /// Enquiry pipeline; medium volatility, churns during business hours.
    Enquiries,
    /// Full matter list; medium volatility, large.
    AllMatters,
    /// Team roster; low volatility.
    TeamData,
    /// Per-user profile data; low volatility.
    UserData,
    /// Recovered fees reporting.
    RecoveredFees,
    /// Proof-of-identity records.
    PoidData,
    /// External marketing metrics; expensive API calls.
    MetaMetrics,
    /// Annual leave calendar.
    AnnualLeave,
}

impl Dataset {
    /// Stable token used in cache keys and environment variable names.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Wip => "wip",
            Self::Enquiries => "enquiries",
            Self::AllMatters => "all_matters",
            Self::TeamData => "team_data",
            Self::UserData => "user_data",
            Self::RecoveredFees => "recovered_fees",
            Self::PoidData => "poid_data",
            Self::MetaMetrics => "meta_metrics",
            Self::AnnualLeave => "annual_leave",
        }
    }

    /// All dataset families.
    pub fn all() -> [Dataset; 9] {
        [
            Self::Wip,
            Self::Enquiries,
            Self::AllMatters,
            Self::TeamData,
            Self::UserData,
            Self::RecoveredFees,
            Self::PoidData,
            Self::MetaMetrics,
            Self::AnnualLeave,
        ]
    }
}

/// Base TTL for one dataset family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetTtl {
    pub ttl_seconds: u64,
}

impl DatasetTtl {
    /// Get TTL as Duration
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// TTL strategy across all dataset families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    pub wip: DatasetTtl,
    pub enquiries: DatasetTtl,
    pub all_matters: DatasetTtl,
    pub team_data: DatasetTtl,
    pub user_data: DatasetTtl,
    pub recovered_fees: DatasetTtl,
    pub poid_data: DatasetTtl,
    pub meta_metrics: DatasetTtl,
    pub annual_leave: DatasetTtl,
    /// Used when a caller asks for an unconfigured dataset family.
    pub fallback: DatasetTtl,
}

impl Default for CacheTtlConfig {
    /// Default configuration suitable for production
    fn default() -> Self {
        Self {
            wip: DatasetTtl { ttl_seconds: 300 },
            enquiries: DatasetTtl { ttl_seconds: 600 },
            all_matters: DatasetTtl { ttl_seconds: 900 },
            team_data: DatasetTtl { ttl_seconds: 1800 },
            user_data: DatasetTtl { ttl_seconds: 1800 },
            recovered_fees: DatasetTtl { ttl_seconds: 1200 },
            poid_data: DatasetTtl { ttl_seconds: 1800 },
            meta_metrics: DatasetTtl { ttl_seconds: 3600 },
            annual_leave: DatasetTtl { ttl_seconds: 1800 },
            fallback: DatasetTtl { ttl_seconds: 600 },
        }
    }
}

impl CacheTtlConfig {
    /// Create test-optimized configuration with rapid invalidation
    pub fn for_test() -> Self {
        Self {
            wip: DatasetTtl { ttl_seconds: 1 },
            enquiries: DatasetTtl { ttl_seconds: 1 },
            all_matters: DatasetTtl { ttl_seconds: 2 },
            team_data: DatasetTtl { ttl_seconds: 5 },
            user_data: DatasetTtl { ttl_seconds: 5 },
            recovered_fees: DatasetTtl { ttl_seconds: 2 },
            poid_data: DatasetTtl { ttl_seconds: 5 },
            meta_metrics: DatasetTtl { ttl_seconds: 10 },
            annual_leave: DatasetTtl { ttl_seconds: 5 },
            fallback: DatasetTtl { ttl_seconds: 1 },
        }
    }

    /// Base TTL for a dataset family, before adaptive rules.
    pub fn base_ttl(&self, dataset: Dataset) -> Duration {
        self.entry(dataset).ttl_duration()
    }

    fn entry(&self, dataset: Dataset) -> &DatasetTtl {
        match dataset {
            Dataset::Wip => &self.wip,
            Dataset::Enquiries => &self.enquiries,
            Dataset::AllMatters => &self.all_matters,
            Dataset::TeamData => &self.team_data,
            Dataset::UserData => &self.user_data,
            Dataset::RecoveredFees => &self.recovered_fees,
            Dataset::PoidData => &self.poid_data,
            Dataset::MetaMetrics => &self.meta_metrics,
            Dataset::AnnualLeave => &self.annual_leave,
        }
    }

    fn entry_mut(&mut self, dataset: Dataset) -> &mut DatasetTtl {
        match dataset {
            Dataset::Wip => &mut self.wip,
            Dataset::Enquiries => &mut self.enquiries,
            Dataset::AllMatters => &mut self.all_matters,
            Dataset::TeamData => &mut self.team_data,
            Dataset::UserData => &mut self.user_data,
            Dataset::RecoveredFees => &mut self.recovered_fees,
            Dataset::PoidData => &mut self.poid_data,
            Dataset::MetaMetrics => &mut self.meta_metrics,
            Dataset::AnnualLeave => &mut self.annual_leave,
        }
    }

    /// Calculate the optimal TTL for a dataset given the result-set size
    /// and the current hour of day (0-23).
    pub fn optimal_ttl(&self, dataset: Dataset, row_count: usize, hour: u32) -> Duration {
        let mut ttl = self.base_ttl(dataset).as_secs_f64();
        let overnight = !(6..22).contains(&hour);
        let out_of_hours = !(9..18).contains(&hour);

        match dataset {
            Dataset::Wip => {
                // Large WIP snapshots go stale fastest
                if row_count > 1000 {
                    ttl *= 0.5;
                }
                if out_of_hours {
                    ttl *= 2.0;
                }
            }
            Dataset::Enquiries => {
                if (9..=17).contains(&hour) {
                    ttl *= 0.8;
                } else {
                    ttl *= 1.5;
                }
            }
            Dataset::AllMatters => {
                // Large matter lists are expensive to rebuild
                if row_count > 5000 {
                    ttl *= 1.2;
                }
            }
            Dataset::TeamData | Dataset::MetaMetrics => {
                if overnight {
                    ttl *= 2.0;
                }
            }
            Dataset::UserData
            | Dataset::RecoveredFees
            | Dataset::PoidData
            | Dataset::AnnualLeave => {}
        }

        Duration::from_secs(ttl.round().max(1.0) as u64)
    }

    /// [`Self::optimal_ttl`] using the local wall-clock hour.
    pub fn optimal_ttl_now(&self, dataset: Dataset, row_count: usize) -> Duration {
        self.optimal_ttl(dataset, row_count, Local::now().hour())
    }

    /// Apply environment variable overrides to configuration
    pub fn with_env_overrides(mut self) -> Self {
        for dataset in Dataset::all() {
            let var = format!(
                "HELIX_CACHE_TTL_{}_SECS",
                dataset.key().to_ascii_uppercase()
            );
            if let Ok(raw) = env::var(&var) {
                if let Ok(seconds) = raw.parse::<u64>() {
                    self.entry_mut(dataset).ttl_seconds = seconds;
                    info!("Overriding {} cache TTL from env: {}s", dataset.key(), seconds);
                }
            }
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> HelixResult<()> {
        for dataset in Dataset::all() {
            if self.entry(dataset).ttl_seconds == 0 {
                return Err(HelixError::Configuration(format!(
                    "cache TTL for {} must be greater than 0",
                    dataset.key()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_ttls_span_minutes_to_an_hour() {
        let config = CacheTtlConfig::default();
        assert_eq!(config.base_ttl(Dataset::Wip), Duration::from_secs(300));
        assert_eq!(
            config.base_ttl(Dataset::MetaMetrics),
            Duration::from_secs(3600)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn large_wip_snapshot_halves_ttl() {
        let config = CacheTtlConfig::default();
        let midday_small = config.optimal_ttl(Dataset::Wip, 100, 12);
        let midday_large = config.optimal_ttl(Dataset::Wip, 5000, 12);
        assert_eq!(midday_large.as_secs() * 2, midday_small.as_secs());
    }

    #[test]
    fn enquiries_shorten_during_business_hours() {
        let config = CacheTtlConfig::default();
        let business = config.optimal_ttl(Dataset::Enquiries, 0, 11);
        let evening = config.optimal_ttl(Dataset::Enquiries, 0, 21);
        assert!(business < config.base_ttl(Dataset::Enquiries));
        assert!(evening > config.base_ttl(Dataset::Enquiries));
    }

    #[test]
    fn metrics_cache_longer_overnight() {
        let config = CacheTtlConfig::default();
        let overnight = config.optimal_ttl(Dataset::MetaMetrics, 0, 23);
        let daytime = config.optimal_ttl(Dataset::MetaMetrics, 0, 14);
        assert_eq!(overnight.as_secs(), daytime.as_secs() * 2);
    }

    #[test]
    fn flat_datasets_keep_base_ttl() {
        let config = CacheTtlConfig::default();
        assert_eq!(
            config.optimal_ttl(Dataset::UserData, 10_000, 3),
            config.base_ttl(Dataset::UserData)
        );
    }

    #[test]
    fn test_profile_uses_second_scale_ttls() {
        let config = CacheTtlConfig::for_test();
        assert!(config.base_ttl(Dataset::MetaMetrics) <= Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }
}
