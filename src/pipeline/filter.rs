//! Risk filter.
//!
//! Decides admit/reject for each simulated prediction. The admission
//! policy is an ordered list of independent rules; every rule is checked
//! and every failing rule's name is reported, so a rejection is always
//! fully explainable — never just a boolean.

use anyhow::Result;
use tracing::debug;

use crate::config::FilterConfig;
use crate::types::{FilterVerdict, FilteredPick, MarketType, MatchPrediction, ScenarioOutcome};

/// Rule names, in evaluation order. Exposed so callers and tests can refer
/// to reasons without string literals drifting apart.
pub const RULE_WORST_CASE: &str = "worst_case_failed";
pub const RULE_LEAGUE: &str = "league_not_allowed";
pub const RULE_MARKET: &str = "market_not_allowed";
pub const RULE_VARIANCE: &str = "variance_too_high";
pub const RULE_PRESSURE: &str = "pressure_too_high";
pub const RULE_REST: &str = "insufficient_rest";
pub const RULE_ODDS_SANITY: &str = "odds_out_of_sanity_band";
pub const RULE_CONFIDENCE: &str = "confidence_below_floor";

/// Applies the admission rules to one prediction + scenario outcome.
pub struct RiskFilter {
    config: FilterConfig,
    /// Allow-list parsed once at construction; unknown names already
    /// failed config validation.
    allowed_markets: Vec<MarketType>,
    allowed_leagues_lower: Vec<String>,
    excluded_types_lower: Vec<String>,
}

impl RiskFilter {
    pub fn new(config: FilterConfig) -> Result<Self> {
        let allowed_markets = config.parsed_markets()?;
        let allowed_leagues_lower = config
            .allowed_leagues
            .iter()
            .map(|l| l.to_lowercase())
            .collect();
        let excluded_types_lower = config
            .excluded_match_types
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        Ok(Self {
            config,
            allowed_markets,
            allowed_leagues_lower,
            excluded_types_lower,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Run every rule and collect the names of those that failed, in
    /// evaluation order. Empty reasons = admitted.
    pub fn assess(
        &self,
        prediction: &MatchPrediction,
        outcome: &ScenarioOutcome,
    ) -> FilterVerdict {
        let checks: [(&str, bool); 8] = [
            (RULE_WORST_CASE, outcome.survives_worst_case),
            (RULE_LEAGUE, self.league_allowed(prediction)),
            (RULE_MARKET, self.market_allowed(prediction)),
            (RULE_VARIANCE, self.variance_under_ceiling(prediction)),
            (RULE_PRESSURE, self.pressure_acceptable(prediction)),
            (RULE_REST, self.rest_sufficient(prediction)),
            (RULE_ODDS_SANITY, self.odds_plausible(prediction)),
            (RULE_CONFIDENCE, self.confidence_met(prediction)),
        ];

        let reasons: Vec<String> = checks
            .iter()
            .filter(|(_, pass)| !pass)
            .map(|(name, _)| name.to_string())
            .collect();

        if !reasons.is_empty() {
            debug!(
                match_id = %prediction.match_id,
                market = %prediction.market,
                reasons = ?reasons,
                "Pick rejected"
            );
        }

        FilterVerdict {
            match_id: prediction.match_id.clone(),
            market: prediction.market,
            admitted: reasons.is_empty(),
            reasons,
        }
    }

    /// Convenience wrapper: the admitted pick, or None.
    pub fn admit(
        &self,
        prediction: &MatchPrediction,
        outcome: &ScenarioOutcome,
    ) -> Option<FilteredPick> {
        if self.assess(prediction, outcome).admitted {
            Some(FilteredPick {
                prediction: prediction.clone(),
                outcome: outcome.clone(),
            })
        } else {
            None
        }
    }

    // -- individual rules ---------------------------------------------------

    /// Cup ties, qualifiers, and friendlies are excluded by category no
    /// matter the league; everything else must be on the allow-list.
    fn league_allowed(&self, p: &MatchPrediction) -> bool {
        let match_type = p.match_type.to_lowercase();
        if self
            .excluded_types_lower
            .iter()
            .any(|excluded| match_type.contains(excluded.as_str()))
        {
            return false;
        }
        self.allowed_leagues_lower
            .contains(&p.league.to_lowercase())
    }

    fn market_allowed(&self, p: &MatchPrediction) -> bool {
        self.allowed_markets.contains(&p.market)
    }

    /// Confidence and variance are orthogonal risk axes: a high-variance
    /// team fails here no matter how sure the model is. An absent variance
    /// never rejects — the ceiling only applies to reported values.
    fn variance_under_ceiling(&self, p: &MatchPrediction) -> bool {
        let under = |v: Option<f64>| v.map_or(true, |v| v <= self.config.variance_ceiling);
        under(p.home_form.goals_variance) && under(p.away_form.goals_variance)
    }

    /// Must-win desperation games are rejected outright. Low stakes are
    /// the simulator's concern (the low-motivation scenario); this rule
    /// guards the other end of the signal.
    fn pressure_acceptable(&self, p: &MatchPrediction) -> bool {
        p.pressure_index <= self.config.max_pressure
    }

    /// Severe congestion disqualifies regardless of how well the pick
    /// survives the congestion scenario's impact factor.
    fn rest_sufficient(&self, p: &MatchPrediction) -> bool {
        p.rest_days >= self.config.min_rest_days
    }

    /// Quotes outside the absolute sanity band are provider data errors,
    /// not opportunities.
    fn odds_plausible(&self, p: &MatchPrediction) -> bool {
        p.odds >= self.config.odds_floor && p.odds <= self.config.odds_cap
    }

    fn confidence_met(&self, p: &MatchPrediction) -> bool {
        p.confidence >= self.config.min_confidence
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
