//! Policy configuration, loaded from TOML.
//!
//! Every threshold the filter, simulator, and selector use is configurable
//! here so the risk policy can be tuned without code changes. Missing
//! sections or fields fall back to the reference policy. `validate` runs
//! at startup and fails fast on misconfiguration, before any match is
//! processed.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;

use crate::types::MarketType;

/// Top-level engine configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub band: BandConfig,
    pub simulator: SimulatorConfig,
    pub filter: FilterConfig,
    pub selector: SelectorConfig,
}

/// Combo acceptance band (inclusive).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BandConfig {
    pub min_odds: f64,
    pub max_odds: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            min_odds: 1.03,
            max_odds: 1.10,
        }
    }
}

impl BandConfig {
    /// Midpoint of the band, the selector's secondary ranking target.
    pub fn midpoint(&self) -> f64 {
        (self.min_odds + self.max_odds) / 2.0
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    /// A scenario fails when the adjusted probability drops below this.
    /// 0.5 means the market must stay more likely than not even under the
    /// adverse condition.
    pub min_survival: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { min_survival: 0.5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    /// Statistically stable competitions (compared case-insensitively).
    pub allowed_leagues: Vec<String>,
    /// Structurally low-variance markets, by wire name. A strict subset of
    /// everything the predictor can emit.
    pub allowed_markets: Vec<String>,
    /// Competition-category keywords excluded regardless of league.
    pub excluded_match_types: Vec<String>,
    /// Ceiling on goals-scored variance for either team.
    pub variance_ceiling: f64,
    /// Ceiling on the stakes signal. Must-win desperation games flip
    /// tactics mid-match; above this they are rejected outright.
    pub max_pressure: f64,
    /// Minimum rest days for the more congested team.
    pub min_rest_days: u32,
    /// Minimum model confidence to admit a pick.
    pub min_confidence: f64,
    /// Absolute odds sanity band; quotes outside it are treated as
    /// provider data errors.
    pub odds_floor: f64,
    pub odds_cap: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_leagues: [
                "EPL",
                "LaLiga",
                "Bundesliga",
                "SerieA",
                "Ligue1",
                "Eredivisie",
                "MLS",
                "Primeira Liga",
                "Scottish Premiership",
                "Belgian First Division",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_markets: [
                "over_0.5_goals",
                "home_over_0.5_goals",
                "away_over_0.5_goals",
                "over_6.5_corners",
                "under_5.5_goals",
                "double_chance_1x",
                "double_chance_x2",
                "home_to_score",
                "away_to_score",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            excluded_match_types: ["cup", "qualifier", "friendly", "youth", "reserve"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            variance_ceiling: 10.0,
            max_pressure: 0.8,
            min_rest_days: 2,
            min_confidence: 0.90,
            odds_floor: 1.01,
            odds_cap: 50.0,
        }
    }
}

impl FilterConfig {
    /// Parse the market allow-list into typed markets. Errors on unknown
    /// wire names so a typo fails at startup, not silently at filter time.
    pub fn parsed_markets(&self) -> Result<Vec<MarketType>> {
        self.allowed_markets
            .iter()
            .map(|s| {
                s.parse::<MarketType>()
                    .with_context(|| format!("filter.allowed_markets entry `{s}`"))
            })
            .collect()
    }
}

/// How per-leg confidences are combined into a combo confidence.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAggregation {
    Product,
    GeometricMean,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorConfig {
    pub confidence_aggregation: ConfidenceAggregation,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            confidence_aggregation: ConfidenceAggregation::Product,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Reject misconfigured policies before any match is processed.
    /// An invalid policy must never silently produce an always-empty day.
    pub fn validate(&self) -> Result<()> {
        if self.band.min_odds > self.band.max_odds {
            bail!(
                "band.min_odds ({}) exceeds band.max_odds ({})",
                self.band.min_odds,
                self.band.max_odds
            );
        }
        if self.band.min_odds <= 1.0 {
            bail!("band.min_odds must be > 1.0 (got {})", self.band.min_odds);
        }
        if !(0.0..=1.0).contains(&self.simulator.min_survival) {
            bail!(
                "simulator.min_survival must be in [0, 1] (got {})",
                self.simulator.min_survival
            );
        }
        if self.filter.allowed_markets.is_empty() {
            bail!("filter.allowed_markets is empty; no pick could ever be admitted");
        }
        if self.filter.allowed_leagues.is_empty() {
            bail!("filter.allowed_leagues is empty; no pick could ever be admitted");
        }
        self.filter.parsed_markets()?;
        if !(0.0..=1.0).contains(&self.filter.min_confidence) {
            bail!(
                "filter.min_confidence must be in [0, 1] (got {})",
                self.filter.min_confidence
            );
        }
        if self.filter.variance_ceiling <= 0.0 {
            bail!(
                "filter.variance_ceiling must be positive (got {})",
                self.filter.variance_ceiling
            );
        }
        if !(0.0..=1.0).contains(&self.filter.max_pressure) {
            bail!(
                "filter.max_pressure must be in [0, 1] (got {})",
                self.filter.max_pressure
            );
        }
        if self.filter.odds_floor >= self.filter.odds_cap {
            bail!(
                "filter.odds_floor ({}) must be below filter.odds_cap ({})",
                self.filter.odds_floor,
                self.filter.odds_cap
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.band.min_odds - 1.03).abs() < 1e-10);
        assert!((cfg.band.max_odds - 1.10).abs() < 1e-10);
        assert!((cfg.simulator.min_survival - 0.5).abs() < 1e-10);
        assert_eq!(
            cfg.selector.confidence_aggregation,
            ConfidenceAggregation::Product
        );
    }

    #[test]
    fn test_band_midpoint() {
        let band = BandConfig {
            min_odds: 1.03,
            max_odds: 1.10,
        };
        assert!((band.midpoint() - 1.065).abs() < 1e-10);
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut cfg = AppConfig::default();
        cfg.band.min_odds = 1.20;
        cfg.band.max_odds = 1.05;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("min_odds"));
    }

    #[test]
    fn test_empty_market_allow_list_rejected() {
        let mut cfg = AppConfig::default();
        cfg.filter.allowed_markets.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_league_allow_list_rejected() {
        let mut cfg = AppConfig::default();
        cfg.filter.allowed_leagues.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unknown_market_name_rejected() {
        let mut cfg = AppConfig::default();
        cfg.filter.allowed_markets.push("anytime_scorer".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("anytime_scorer"));
    }

    #[test]
    fn test_out_of_range_thresholds_rejected() {
        let mut cfg = AppConfig::default();
        cfg.simulator.min_survival = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.filter.min_confidence = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.filter.max_pressure = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.filter.odds_floor = 60.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_reference_policy() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [band]
            min_odds = 1.04
            max_odds = 1.08
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert!((cfg.band.min_odds - 1.04).abs() < 1e-10);
        // Untouched sections carry the reference policy.
        assert!((cfg.filter.min_confidence - 0.90).abs() < 1e-10);
        assert!(!cfg.filter.allowed_markets.is_empty());
    }

    #[test]
    fn test_aggregation_parses_snake_case() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [selector]
            confidence_aggregation = "geometric_mean"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.selector.confidence_aggregation,
            ConfidenceAggregation::GeometricMean
        );
    }
}
