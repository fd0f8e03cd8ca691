//! The three-stage decision pipeline: simulate → filter → select.
//!
//! A single synchronous pass over one day's predictions. Every stage is a
//! pure function of its input, so the full run is deterministic and days
//! can be processed independently with no coordination.

pub mod filter;
pub mod selector;
pub mod simulator;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::feed::{self, RawMatchRecord, SkippedRecord};
use crate::types::{FilterVerdict, FilteredPick, MatchPrediction, Recommendation, ScenarioOutcome};
use filter::RiskFilter;
use selector::ComboSelector;
use simulator::ScenarioSimulator;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One prediction with its worst-case judgement — the transparency view
/// before any filtering.
#[derive(Debug, Clone, Serialize)]
pub struct RawAssessment {
    pub prediction: MatchPrediction,
    pub outcome: ScenarioOutcome,
}

/// Everything a day's run produces. The recommendation is the externally
/// consumed artifact; raw and filtered views exist for transparency and
/// audit, and `skipped` records the malformed inputs excluded at intake.
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub raw: Vec<RawAssessment>,
    pub filtered: Vec<FilterVerdict>,
    pub recommendation: Recommendation,
    pub skipped: Vec<SkippedRecord>,
}

impl DayReport {
    /// Match ids admitted by the filter (handy for audits and tests).
    pub fn admitted_ids(&self) -> Vec<&str> {
        self.filtered
            .iter()
            .filter(|v| v.admitted)
            .map(|v| v.match_id.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Wires the three stages together under one policy.
///
/// Instantiate once per policy; `run` may be called any number of times —
/// it holds no mutable state between runs.
pub struct SafeOddsPipeline {
    simulator: ScenarioSimulator,
    filter: RiskFilter,
    selector: ComboSelector,
}

impl SafeOddsPipeline {
    /// Build a pipeline from a validated configuration. Policy errors
    /// (inverted band, empty allow-lists, unknown market names) are
    /// rejected here, before any match is processed.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            simulator: ScenarioSimulator::new(config.simulator.clone()),
            filter: RiskFilter::new(config.filter.clone())?,
            selector: ComboSelector::new(config.band.clone(), config.selector.clone()),
        })
    }

    /// Run the full pipeline over one day's raw records.
    pub fn run(&self, records: &[RawMatchRecord]) -> DayReport {
        // Intake: isolate malformed records, keep the rest.
        let (predictions, skipped) = feed::validate_day(records);
        info!(
            records_in = records.len(),
            well_formed = predictions.len(),
            skipped = skipped.len(),
            "Intake complete"
        );

        // Stage 1: worst-case simulation for every prediction.
        let raw: Vec<RawAssessment> = predictions
            .iter()
            .map(|p| RawAssessment {
                prediction: p.clone(),
                outcome: self.simulator.simulate(p),
            })
            .collect();
        let survivors = raw
            .iter()
            .filter(|a| a.outcome.survives_worst_case)
            .count();
        info!(
            simulated = raw.len(),
            worst_case_survivors = survivors,
            "Scenario simulation complete"
        );

        // Stage 2: admission rules; verdicts kept for every match.
        let mut filtered = Vec::with_capacity(raw.len());
        let mut admitted: Vec<FilteredPick> = Vec::new();
        for assessment in &raw {
            let verdict = self.filter.assess(&assessment.prediction, &assessment.outcome);
            if verdict.admitted {
                admitted.push(FilteredPick {
                    prediction: assessment.prediction.clone(),
                    outcome: assessment.outcome.clone(),
                });
            }
            filtered.push(verdict);
        }
        info!(
            assessed = filtered.len(),
            admitted = admitted.len(),
            "Risk filtering complete"
        );

        // Stage 3: bounded combo search over the admitted set.
        let recommendation = self.selector.recommend(&admitted);
        match &recommendation {
            Recommendation::Combo(combo) => info!(
                legs = combo.leg_count(),
                total_odds = format!("{:.4}", combo.total_odds),
                confidence = format!("{:.1}%", combo.combined_confidence * 100.0),
                "Combo selected"
            ),
            Recommendation::Empty { reason } => info!(%reason, "No combo today"),
        }

        DayReport {
            raw,
            filtered,
            recommendation,
            skipped,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::RawMatchRecord;

    fn record(id: &str, market: &str, odds: f64, confidence: f64) -> RawMatchRecord {
        RawMatchRecord {
            match_id: Some(id.to_string()),
            league: Some("EPL".to_string()),
            match_type: Some("league".to_string()),
            market: Some(market.to_string()),
            odds: Some(odds),
            confidence: Some(confidence),
            home_xg: Some(1.6),
            away_xg: Some(1.2),
            ..Default::default()
        }
    }

    fn pipeline() -> SafeOddsPipeline {
        SafeOddsPipeline::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn test_single_safe_pick_becomes_one_leg_combo() {
        let records = vec![record("m1", "over_0.5_goals", 1.05, 0.97)];
        let report = pipeline().run(&records);

        assert_eq!(report.raw.len(), 1);
        assert!(report.raw[0].outcome.survives_worst_case);
        assert_eq!(report.admitted_ids(), vec!["m1"]);

        let combo = report.recommendation.combo().expect("combo expected");
        assert_eq!(combo.leg_count(), 1);
        assert!((combo.total_odds - 1.05).abs() < 1e-10);
    }

    #[test]
    fn test_rejected_match_never_reaches_combo() {
        let records = vec![
            record("safe", "over_0.5_goals", 1.05, 0.97),
            // Market off the allow-list: admitted nowhere.
            record("risky", "home_win", 1.06, 0.99),
        ];
        let report = pipeline().run(&records);

        let risky = report
            .filtered
            .iter()
            .find(|v| v.match_id == "risky")
            .unwrap();
        assert!(!risky.admitted);

        if let Some(combo) = report.recommendation.combo() {
            assert!(combo.legs.iter().all(|l| l.match_id != "risky"));
        }
    }

    #[test]
    fn test_cup_match_reported_with_league_reason() {
        let mut cup = record("cup1", "over_0.5_goals", 1.06, 0.99);
        cup.match_type = Some("cup".to_string());
        let report = pipeline().run(&[cup]);
        let verdict = &report.filtered[0];
        assert!(!verdict.admitted);
        assert_eq!(verdict.reasons, vec!["league_not_allowed".to_string()]);
    }

    #[test]
    fn test_no_viable_combo_is_explicit_empty() {
        // Admitted, but 1.25 alone is out of band and there is nothing to
        // pair it with.
        let records = vec![record("m1", "home_to_score", 1.25, 0.95)];
        let report = pipeline().run(&records);
        assert_eq!(report.admitted_ids(), vec!["m1"]);
        match &report.recommendation {
            Recommendation::Empty { reason } => {
                assert!(reason.contains("odds band"));
            }
            _ => panic!("expected empty recommendation"),
        }
    }

    #[test]
    fn test_malformed_record_isolated_not_fatal() {
        let mut bad = record("bad", "over_0.5_goals", 1.05, 0.95);
        bad.confidence = None;
        let records = vec![record("m1", "over_0.5_goals", 1.05, 0.97), bad];
        let report = pipeline().run(&records);

        assert_eq!(report.raw.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("confidence"));
        assert!(report.recommendation.combo().is_some());
    }

    #[test]
    fn test_sparse_record_still_flows_through() {
        // Only the required fields: fallback stats degrade, not crash.
        let sparse = RawMatchRecord {
            match_id: Some("sparse".to_string()),
            market: Some("over_0.5_goals".to_string()),
            odds: Some(1.05),
            confidence: Some(0.97),
            ..Default::default()
        };
        let report = pipeline().run(&[sparse]);
        assert_eq!(report.raw.len(), 1);
        assert!(report.raw[0].outcome.degraded_inputs);
        // League defaulted to "unknown" → rejected, with a reason.
        assert!(!report.filtered[0].admitted);
        assert!(report.filtered[0]
            .reasons
            .contains(&"league_not_allowed".to_string()));
    }

    #[test]
    fn test_run_is_deterministic() {
        let records = vec![
            record("m2", "over_0.5_goals", 1.04, 0.96),
            record("m1", "home_over_0.5_goals", 1.03, 0.94),
            record("m3", "away_to_score", 1.06, 0.93),
        ];
        let p = pipeline();
        let a = serde_json::to_string(&p.run(&records)).unwrap();
        let b = serde_json::to_string(&p.run(&records)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_misconfigured_policy_fails_before_processing() {
        let mut cfg = AppConfig::default();
        cfg.band.min_odds = 2.0;
        cfg.band.max_odds = 1.05;
        assert!(SafeOddsPipeline::from_config(&cfg).is_err());
    }
}
