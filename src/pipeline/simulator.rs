//! Worst-case scenario simulation.
//!
//! Stress-tests a prediction against a fixed catalogue of eight adverse
//! in-match scenarios. The catalogue is a data table — each entry pairs an
//! applicability predicate over market types with an impact rule over the
//! prediction's fields — so new scenarios are additive, not new branches.
//!
//! Pure: no I/O, deterministic, always returns an outcome for well-formed
//! input. Missing statistics were already replaced with flagged fallbacks
//! at intake, so every rule reads concrete values.

use tracing::debug;

use crate::config::SimulatorConfig;
use crate::types::{MarketType, MatchPrediction, ScenarioKind, ScenarioOutcome, ScenarioResult};

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// One catalogue entry: which markets the scenario touches, and the
/// multiplicative hit it applies to the effective success probability.
struct Scenario {
    kind: ScenarioKind,
    applies: fn(MarketType) -> bool,
    impact: fn(&MatchPrediction) -> f64,
}

fn any_market(_: MarketType) -> bool {
    true
}

/// A red card swings scorelines by roughly a goal and drains attacking
/// output; only markets indifferent to a one-goal swing hold up.
fn red_card_impact(p: &MatchPrediction) -> f64 {
    if p.market.one_goal_insensitive() {
        0.94
    } else {
        0.78
    }
}

fn injury_applies(market: MarketType) -> bool {
    market.goal_dependent() || market.is_result_market()
}

/// Losing the key attacker hurts less when both sides create plenty.
fn injury_impact(p: &MatchPrediction) -> f64 {
    if p.home_xg + p.away_xg >= 3.0 {
        0.92
    } else {
        0.85
    }
}

fn weather_applies(market: MarketType) -> bool {
    market.goal_dependent()
}

/// Rain and wind suppress goals, but a single goal still almost always
/// arrives, so over-0.5 totals keep a high floor.
fn weather_impact(p: &MatchPrediction) -> f64 {
    if p.market.over_half_goal() {
        0.93
    } else {
        0.85
    }
}

/// Dead rubbers: nothing to play for, nobody runs.
fn motivation_impact(p: &MatchPrediction) -> f64 {
    if p.pressure_index < 0.3 {
        0.80
    } else {
        1.0
    }
}

fn referee_applies(market: MarketType) -> bool {
    market.is_result_market()
}

/// A one-sided whistle mostly shifts results, not goal counts.
fn referee_impact(_: &MatchPrediction) -> f64 {
    0.90
}

fn congestion_applies(market: MarketType) -> bool {
    market.goal_dependent() || market.is_result_market()
}

fn congestion_impact(p: &MatchPrediction) -> f64 {
    if p.rest_days < 3 {
        0.85
    } else {
        0.95
    }
}

fn lineup_impact(p: &MatchPrediction) -> f64 {
    if p.key_player_missing {
        0.80
    } else {
        0.93
    }
}

fn derby_applies(market: MarketType) -> bool {
    market.is_result_market() || market.is_under_market()
}

/// Derbies are chaos: form goes out the window for result and under
/// markets, while goal totals are untouched or helped.
fn derby_impact(p: &MatchPrediction) -> f64 {
    if p.is_derby {
        0.82
    } else {
        1.0
    }
}

static CATALOGUE: [Scenario; 8] = [
    Scenario {
        kind: ScenarioKind::EarlyRedCard,
        applies: any_market,
        impact: red_card_impact,
    },
    Scenario {
        kind: ScenarioKind::KeyPlayerInjury,
        applies: injury_applies,
        impact: injury_impact,
    },
    Scenario {
        kind: ScenarioKind::BadWeather,
        applies: weather_applies,
        impact: weather_impact,
    },
    Scenario {
        kind: ScenarioKind::LowMotivation,
        applies: any_market,
        impact: motivation_impact,
    },
    Scenario {
        kind: ScenarioKind::RefereeBias,
        applies: referee_applies,
        impact: referee_impact,
    },
    Scenario {
        kind: ScenarioKind::FixtureCongestion,
        applies: congestion_applies,
        impact: congestion_impact,
    },
    Scenario {
        kind: ScenarioKind::UnexpectedLineupChange,
        applies: any_market,
        impact: lineup_impact,
    },
    Scenario {
        kind: ScenarioKind::DerbyIntensity,
        applies: derby_applies,
        impact: derby_impact,
    },
];

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Runs every catalogue scenario against one prediction.
pub struct ScenarioSimulator {
    config: SimulatorConfig,
}

impl ScenarioSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Judge worst-case survival for one prediction.
    ///
    /// A scenario the market is not covered by leaves it unaffected
    /// (factor 1.0, survives) — absence of a rule is never failure. A
    /// covered scenario fails when the adjusted probability drops below
    /// the minimum-survival threshold. The safety score is the minimum
    /// adjusted probability across the whole catalogue.
    pub fn simulate(&self, prediction: &MatchPrediction) -> ScenarioOutcome {
        let mut results = Vec::with_capacity(CATALOGUE.len());
        let mut safety_score = prediction.confidence.clamp(0.0, 1.0);
        let mut survives_worst_case = true;

        for scenario in &CATALOGUE {
            let result = if (scenario.applies)(prediction.market) {
                let impact_factor = (scenario.impact)(prediction);
                let adjusted = (prediction.confidence * impact_factor).clamp(0.0, 1.0);
                ScenarioResult {
                    scenario: scenario.kind,
                    impact_factor,
                    adjusted_probability: adjusted,
                    survives: adjusted >= self.config.min_survival,
                }
            } else {
                ScenarioResult {
                    scenario: scenario.kind,
                    impact_factor: 1.0,
                    adjusted_probability: prediction.confidence.clamp(0.0, 1.0),
                    survives: true,
                }
            };

            if result.adjusted_probability < safety_score {
                safety_score = result.adjusted_probability;
            }
            if !result.survives {
                debug!(
                    match_id = %prediction.match_id,
                    scenario = %result.scenario,
                    adjusted = format!("{:.3}", result.adjusted_probability),
                    threshold = self.config.min_survival,
                    "Scenario failed"
                );
                survives_worst_case = false;
            }
            results.push(result);
        }

        ScenarioOutcome {
            match_id: prediction.match_id.clone(),
            results,
            safety_score,
            survives_worst_case,
            degraded_inputs: prediction.uses_fallback_stats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
