//! Shared types for the safe-odds engine.
//!
//! These types form the data model used across all pipeline stages.
//! Every entity is an immutable value record: produced by one stage and
//! read-only to the next, so stages never share mutable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// The predicted outcome type for a match, as emitted by the upstream
/// prediction supplier. Wire names are the provider's snake_case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Over05Goals,
    HomeOver05Goals,
    AwayOver05Goals,
    Over25Goals,
    Under55Goals,
    Over65Corners,
    DoubleChance1x,
    DoubleChanceX2,
    HomeToScore,
    AwayToScore,
    BttsYes,
    BttsNo,
    HomeWin,
    AwayWin,
    Draw,
}

impl MarketType {
    /// All known market types (useful for iteration).
    pub const ALL: &'static [MarketType] = &[
        MarketType::Over05Goals,
        MarketType::HomeOver05Goals,
        MarketType::AwayOver05Goals,
        MarketType::Over25Goals,
        MarketType::Under55Goals,
        MarketType::Over65Corners,
        MarketType::DoubleChance1x,
        MarketType::DoubleChanceX2,
        MarketType::HomeToScore,
        MarketType::AwayToScore,
        MarketType::BttsYes,
        MarketType::BttsNo,
        MarketType::HomeWin,
        MarketType::AwayWin,
        MarketType::Draw,
    ];

    /// The provider wire name for this market.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MarketType::Over05Goals => "over_0.5_goals",
            MarketType::HomeOver05Goals => "home_over_0.5_goals",
            MarketType::AwayOver05Goals => "away_over_0.5_goals",
            MarketType::Over25Goals => "over_2.5_goals",
            MarketType::Under55Goals => "under_5.5_goals",
            MarketType::Over65Corners => "over_6.5_corners",
            MarketType::DoubleChance1x => "double_chance_1x",
            MarketType::DoubleChanceX2 => "double_chance_x2",
            MarketType::HomeToScore => "home_to_score",
            MarketType::AwayToScore => "away_to_score",
            MarketType::BttsYes => "btts_yes",
            MarketType::BttsNo => "btts_no",
            MarketType::HomeWin => "home_win",
            MarketType::AwayWin => "away_win",
            MarketType::Draw => "draw",
        }
    }

    /// Whether this market's outcome cannot be flipped by a single goal
    /// either way. These survive scenarios that shift scorelines by one.
    pub fn one_goal_insensitive(&self) -> bool {
        matches!(
            self,
            MarketType::Over05Goals
                | MarketType::HomeOver05Goals
                | MarketType::AwayOver05Goals
                | MarketType::Over65Corners
        )
    }

    /// Whether this market needs goals to be scored to pay out.
    pub fn goal_dependent(&self) -> bool {
        matches!(
            self,
            MarketType::Over05Goals
                | MarketType::HomeOver05Goals
                | MarketType::AwayOver05Goals
                | MarketType::Over25Goals
                | MarketType::HomeToScore
                | MarketType::AwayToScore
                | MarketType::BttsYes
        )
    }

    /// Whether this is an over-0.5-style total (at least one goal for a
    /// side or the match). These keep a high floor under most scenarios.
    pub fn over_half_goal(&self) -> bool {
        matches!(
            self,
            MarketType::Over05Goals | MarketType::HomeOver05Goals | MarketType::AwayOver05Goals
        )
    }

    /// Whether this market settles on the match result.
    pub fn is_result_market(&self) -> bool {
        matches!(
            self,
            MarketType::HomeWin
                | MarketType::AwayWin
                | MarketType::Draw
                | MarketType::DoubleChance1x
                | MarketType::DoubleChanceX2
        )
    }

    /// Whether this market pays out on goals NOT being scored.
    pub fn is_under_market(&self) -> bool {
        matches!(self, MarketType::Under55Goals | MarketType::BttsNo)
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl std::str::FromStr for MarketType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MarketType::ALL
            .iter()
            .find(|m| m.wire_name() == s)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown market type: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Team statistics
// ---------------------------------------------------------------------------

/// Recent-form aggregates for one team.
///
/// `provider_default` is true when any field was filled from the named
/// fallback at intake, whether the provider sent nothing or only part of
/// the record. The flag is surfaced in the raw view so degraded inputs
/// are never indistinguishable from real data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamForm {
    pub goals_scored_avg: f64,
    pub goals_conceded_avg: f64,
    /// Variance of goals scored over recent matches. None when the
    /// provider did not supply one.
    pub goals_variance: Option<f64>,
    pub shots_on_target_avg: f64,
    pub provider_default: bool,
}

impl TeamForm {
    /// The explicit fallback used when provider form data is absent.
    /// Middle-of-the-road values: the engine neither flatters nor damns a
    /// team it knows nothing about.
    pub fn fallback() -> Self {
        TeamForm {
            goals_scored_avg: 1.3,
            goals_conceded_avg: 1.3,
            goals_variance: None,
            shots_on_target_avg: 4.0,
            provider_default: true,
        }
    }
}

/// Head-to-head aggregates for the fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadToHead {
    pub meetings: u32,
    pub avg_total_goals: f64,
    pub provider_default: bool,
}

impl HeadToHead {
    /// Fallback when no head-to-head history was supplied.
    pub fn fallback() -> Self {
        HeadToHead {
            meetings: 0,
            avg_total_goals: 2.5,
            provider_default: true,
        }
    }
}

// ---------------------------------------------------------------------------
// MatchPrediction
// ---------------------------------------------------------------------------

/// One model prediction for one fixture on one day. Created by the intake
/// layer from the provider record; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub match_id: String,
    pub league: String,
    /// Competition category string from the provider ("league", "cup",
    /// "friendly", ...). Used by the league admission rule.
    pub match_type: String,
    pub kickoff: Option<DateTime<Utc>>,
    pub market: MarketType,
    /// Quoted decimal odds for the market (> 1.0).
    pub odds: f64,
    /// Model confidence probability in (0, 1].
    pub confidence: f64,
    pub home_xg: f64,
    pub away_xg: f64,
    pub home_form: TeamForm,
    pub away_form: TeamForm,
    pub h2h: HeadToHead,
    /// Stakes signal in [0, 1]: 0 = dead rubber, 1 = must-win.
    pub pressure_index: f64,
    /// Days since the more congested team last played.
    pub rest_days: u32,
    pub is_derby: bool,
    pub key_player_missing: bool,
}

impl fmt::Display for MatchPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} @ {:.2} (conf {:.0}%)",
            self.league,
            self.match_id,
            self.market,
            self.odds,
            self.confidence * 100.0,
        )
    }
}

impl MatchPrediction {
    /// Whether any statistical input was filled from a named fallback.
    pub fn uses_fallback_stats(&self) -> bool {
        self.home_form.provider_default
            || self.away_form.provider_default
            || self.h2h.provider_default
    }

    /// Helper to build a test prediction with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, market: MarketType, odds: f64, confidence: f64) -> Self {
        MatchPrediction {
            match_id: id.to_string(),
            league: "EPL".to_string(),
            match_type: "league".to_string(),
            kickoff: Some(Utc::now() + chrono::Duration::hours(6)),
            market,
            odds,
            confidence,
            home_xg: 1.6,
            away_xg: 1.2,
            home_form: TeamForm {
                goals_scored_avg: 1.8,
                goals_conceded_avg: 1.0,
                goals_variance: Some(1.4),
                shots_on_target_avg: 5.2,
                provider_default: false,
            },
            away_form: TeamForm {
                goals_scored_avg: 1.2,
                goals_conceded_avg: 1.4,
                goals_variance: Some(1.1),
                shots_on_target_avg: 4.1,
                provider_default: false,
            },
            h2h: HeadToHead {
                meetings: 8,
                avg_total_goals: 2.9,
                provider_default: false,
            },
            pressure_index: 0.5,
            rest_days: 7,
            is_derby: false,
            key_player_missing: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario outcome
// ---------------------------------------------------------------------------

/// One of the eight adverse in-match scenarios in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    EarlyRedCard,
    KeyPlayerInjury,
    BadWeather,
    LowMotivation,
    RefereeBias,
    FixtureCongestion,
    UnexpectedLineupChange,
    DerbyIntensity,
}

impl ScenarioKind {
    pub const ALL: &'static [ScenarioKind] = &[
        ScenarioKind::EarlyRedCard,
        ScenarioKind::KeyPlayerInjury,
        ScenarioKind::BadWeather,
        ScenarioKind::LowMotivation,
        ScenarioKind::RefereeBias,
        ScenarioKind::FixtureCongestion,
        ScenarioKind::UnexpectedLineupChange,
        ScenarioKind::DerbyIntensity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::EarlyRedCard => "early_red_card",
            ScenarioKind::KeyPlayerInjury => "key_player_injury",
            ScenarioKind::BadWeather => "bad_weather",
            ScenarioKind::LowMotivation => "low_motivation",
            ScenarioKind::RefereeBias => "referee_bias",
            ScenarioKind::FixtureCongestion => "fixture_congestion",
            ScenarioKind::UnexpectedLineupChange => "unexpected_lineup_change",
            ScenarioKind::DerbyIntensity => "derby_intensity",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The simulator's judgement for a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: ScenarioKind,
    /// Multiplicative factor applied to the market's effective success
    /// probability (1.0 = scenario does not touch this market).
    pub impact_factor: f64,
    pub adjusted_probability: f64,
    pub survives: bool,
}

/// Worst-case survival judgement for one prediction. Pure function of its
/// `MatchPrediction` given a fixed catalogue; recomputed every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub match_id: String,
    pub results: Vec<ScenarioResult>,
    /// Minimum adjusted probability across the catalogue. Worst case, not
    /// average: one catastrophic scenario dominates the score.
    pub safety_score: f64,
    /// AND over all scenario flags: one failure disqualifies the match.
    pub survives_worst_case: bool,
    /// True when fallback statistics were injected upstream.
    pub degraded_inputs: bool,
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed: Vec<&str> = self
            .results
            .iter()
            .filter(|r| !r.survives)
            .map(|r| r.scenario.name())
            .collect();
        write!(
            f,
            "{}: safety={:.3} survives={} failed=[{}]",
            self.match_id,
            self.safety_score,
            self.survives_worst_case,
            failed.join(", "),
        )
    }
}

// ---------------------------------------------------------------------------
// Filter output
// ---------------------------------------------------------------------------

/// A prediction that passed every admission rule, paired with its
/// scenario outcome. Only these are eligible for combo selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredPick {
    pub prediction: MatchPrediction,
    pub outcome: ScenarioOutcome,
}

/// Per-match audit record from the risk filter: pass/fail plus the
/// ordered names of every rule that failed (empty on pass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterVerdict {
    pub match_id: String,
    pub market: MarketType,
    pub admitted: bool,
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Combo
// ---------------------------------------------------------------------------

/// One leg of a recommended combo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboLeg {
    pub match_id: String,
    pub market: MarketType,
    pub odds: f64,
    pub confidence: f64,
}

/// A 1–3-leg accumulator whose combined odds land inside the target band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combo {
    pub legs: Vec<ComboLeg>,
    /// Product of each leg's quoted odds.
    pub total_odds: f64,
    pub combined_confidence: f64,
    pub safety_rationale: String,
}

impl Combo {
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let legs: Vec<String> = self
            .legs
            .iter()
            .map(|l| format!("{} {} @ {:.2}", l.match_id, l.market, l.odds))
            .collect();
        write!(
            f,
            "{}-leg combo @ {:.4} (conf {:.1}%): {}",
            self.leg_count(),
            self.total_odds,
            self.combined_confidence * 100.0,
            legs.join(" + "),
        )
    }
}

/// The day's recommendation: a combo, or an explicit empty result with a
/// human-readable reason. An empty day is a first-class answer, not an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Combo(Combo),
    Empty { reason: String },
}

impl Recommendation {
    pub fn combo(&self) -> Option<&Combo> {
        match self {
            Recommendation::Combo(c) => Some(c),
            Recommendation::Empty { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Domain-specific error types for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Malformed input record {match_id}: missing or invalid field `{field}`")]
    MalformedInput { match_id: String, field: &'static str },

    #[error("Policy misconfiguration: {0}")]
    Policy(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
