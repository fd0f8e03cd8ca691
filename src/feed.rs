//! Intake of upstream prediction records.
//!
//! The match-fetching/enrichment collaborator hands us one JSON record per
//! fixture per day. Everything on the wire is optional; this module decides
//! which absences are tolerable (statistics, filled from named fallbacks)
//! and which make the record malformed (identity, market, odds,
//! confidence). A malformed record is logged and skipped — one bad record
//! never aborts the day's run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{EngineError, HeadToHead, MarketType, MatchPrediction, TeamForm};

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// One provider record, exactly as it arrives. Every field is optional so
/// deserialization itself never fails on a sparse record.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawMatchRecord {
    pub match_id: Option<String>,
    pub league: Option<String>,
    pub match_type: Option<String>,
    pub kickoff_time: Option<DateTime<Utc>>,
    pub market: Option<String>,
    pub odds: Option<f64>,
    pub confidence: Option<f64>,
    pub home_xg: Option<f64>,
    pub away_xg: Option<f64>,
    pub home_form: Option<RawTeamForm>,
    pub away_form: Option<RawTeamForm>,
    pub h2h: Option<RawHeadToHead>,
    pub pressure_index: Option<f64>,
    pub rest_days: Option<u32>,
    pub is_derby: Option<bool>,
    pub key_player_missing: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTeamForm {
    pub goals_scored_avg: Option<f64>,
    pub goals_conceded_avg: Option<f64>,
    pub goals_variance: Option<f64>,
    pub shots_on_target_avg: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHeadToHead {
    pub meetings: Option<u32>,
    pub avg_total_goals: Option<f64>,
}

/// Audit entry for a record excluded at intake.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    /// Position in the input list (the record may have no usable id).
    pub index: usize,
    pub match_id: Option<String>,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Convert a day's raw records into predictions, excluding malformed ones.
/// Returns the well-formed predictions and the skip audit trail.
pub fn validate_day(records: &[RawMatchRecord]) -> (Vec<MatchPrediction>, Vec<SkippedRecord>) {
    let mut predictions = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match build_prediction(record) {
            Ok(prediction) => predictions.push(prediction),
            Err(e) => {
                warn!(
                    index,
                    match_id = record.match_id.as_deref().unwrap_or("<none>"),
                    error = %e,
                    "Skipping malformed record"
                );
                skipped.push(SkippedRecord {
                    index,
                    match_id: record.match_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (predictions, skipped)
}

/// Build one prediction from a raw record, or report which field is
/// missing/invalid so the supplier can correct the input.
pub fn build_prediction(record: &RawMatchRecord) -> Result<MatchPrediction, EngineError> {
    let match_id = record
        .match_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed(record, "match_id"))?;

    let market: MarketType = record
        .market
        .as_deref()
        .ok_or_else(|| malformed(record, "market"))?
        .parse()
        .map_err(|_| malformed(record, "market"))?;

    let odds = record.odds.ok_or_else(|| malformed(record, "odds"))?;
    if !odds.is_finite() || odds <= 1.0 {
        return Err(malformed(record, "odds"));
    }

    let confidence = record
        .confidence
        .ok_or_else(|| malformed(record, "confidence"))?;
    if !confidence.is_finite() || confidence <= 0.0 || confidence > 1.0 {
        return Err(malformed(record, "confidence"));
    }

    Ok(MatchPrediction {
        match_id,
        league: record.league.clone().unwrap_or_else(|| "unknown".to_string()),
        match_type: record
            .match_type
            .clone()
            .unwrap_or_else(|| "league".to_string()),
        kickoff: record.kickoff_time,
        market,
        odds,
        confidence,
        home_xg: record.home_xg.unwrap_or(1.3),
        away_xg: record.away_xg.unwrap_or(1.3),
        home_form: convert_form(record.home_form.as_ref()),
        away_form: convert_form(record.away_form.as_ref()),
        h2h: convert_h2h(record.h2h.as_ref()),
        pressure_index: record.pressure_index.unwrap_or(0.5).clamp(0.0, 1.0),
        rest_days: record.rest_days.unwrap_or(7),
        is_derby: record.is_derby.unwrap_or(false),
        key_player_missing: record.key_player_missing.unwrap_or(false),
    })
}

fn malformed(record: &RawMatchRecord, field: &'static str) -> EngineError {
    EngineError::MalformedInput {
        match_id: record
            .match_id
            .clone()
            .unwrap_or_else(|| "<none>".to_string()),
        field,
    }
}

/// Map provider form onto the core type. Missing fields are completed
/// from the named fallback, and ANY substitution flags the form as
/// provider-defaulted — a partial record must stay distinguishable from
/// real data in the raw view. An absent variance stays `None` (nothing is
/// substituted for it) and does not flag on its own.
fn convert_form(raw: Option<&RawTeamForm>) -> TeamForm {
    match raw {
        None => TeamForm::fallback(),
        Some(r) => {
            let fb = TeamForm::fallback();
            let complete = r.goals_scored_avg.is_some()
                && r.goals_conceded_avg.is_some()
                && r.shots_on_target_avg.is_some();
            TeamForm {
                goals_scored_avg: r.goals_scored_avg.unwrap_or(fb.goals_scored_avg),
                goals_conceded_avg: r.goals_conceded_avg.unwrap_or(fb.goals_conceded_avg),
                goals_variance: r.goals_variance,
                shots_on_target_avg: r.shots_on_target_avg.unwrap_or(fb.shots_on_target_avg),
                provider_default: !complete,
            }
        }
    }
}

fn convert_h2h(raw: Option<&RawHeadToHead>) -> HeadToHead {
    match raw {
        None => HeadToHead::fallback(),
        Some(r) => {
            let fb = HeadToHead::fallback();
            let complete = r.meetings.is_some() && r.avg_total_goals.is_some();
            HeadToHead {
                meetings: r.meetings.unwrap_or(0),
                avg_total_goals: r.avg_total_goals.unwrap_or(fb.avg_total_goals),
                provider_default: !complete,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_record(id: &str) -> RawMatchRecord {
        RawMatchRecord {
            match_id: Some(id.to_string()),
            market: Some("over_0.5_goals".to_string()),
            odds: Some(1.05),
            confidence: Some(0.95),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_record_builds_with_fallbacks() {
        let p = build_prediction(&minimal_record("m1")).unwrap();
        assert_eq!(p.match_id, "m1");
        assert_eq!(p.market, MarketType::Over05Goals);
        assert_eq!(p.league, "unknown");
        assert_eq!(p.match_type, "league");
        assert!(p.kickoff.is_none());
        assert!(p.home_form.provider_default);
        assert!(p.away_form.provider_default);
        assert!(p.h2h.provider_default);
        assert!(p.uses_fallback_stats());
    }

    #[test]
    fn test_missing_match_id_is_malformed() {
        let mut r = minimal_record("m1");
        r.match_id = None;
        let err = build_prediction(&r).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MalformedInput { field: "match_id", .. }
        ));
    }

    #[test]
    fn test_empty_match_id_is_malformed() {
        let mut r = minimal_record("");
        r.match_id = Some(String::new());
        assert!(build_prediction(&r).is_err());
    }

    #[test]
    fn test_unknown_market_is_malformed() {
        let mut r = minimal_record("m1");
        r.market = Some("correct_score_2_1".to_string());
        let err = build_prediction(&r).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MalformedInput { field: "market", .. }
        ));
    }

    #[test]
    fn test_implausible_odds_are_malformed() {
        for bad in [0.95, 1.0, f64::NAN, f64::INFINITY] {
            let mut r = minimal_record("m1");
            r.odds = Some(bad);
            assert!(build_prediction(&r).is_err(), "odds {bad} should fail");
        }
    }

    #[test]
    fn test_confidence_outside_unit_interval_is_malformed() {
        for bad in [0.0, -0.2, 1.2] {
            let mut r = minimal_record("m1");
            r.confidence = Some(bad);
            assert!(build_prediction(&r).is_err(), "confidence {bad} should fail");
        }
        // 1.0 is inside (0, 1].
        let mut r = minimal_record("m1");
        r.confidence = Some(1.0);
        assert!(build_prediction(&r).is_ok());
    }

    #[test]
    fn test_partial_form_flagged_as_default() {
        // Conceded average and shots were substituted, so the form must
        // surface as provider-defaulted even though real data is present.
        let mut r = minimal_record("m1");
        r.home_form = Some(RawTeamForm {
            goals_scored_avg: Some(2.1),
            goals_variance: Some(0.8),
            ..Default::default()
        });
        let p = build_prediction(&r).unwrap();
        assert!(p.home_form.provider_default);
        assert!((p.home_form.goals_scored_avg - 2.1).abs() < 1e-10);
        assert_eq!(p.home_form.goals_variance, Some(0.8));
        assert!(p.away_form.provider_default);
        assert!(p.uses_fallback_stats());
    }

    #[test]
    fn test_complete_form_not_flagged() {
        let mut r = minimal_record("m1");
        let full = RawTeamForm {
            goals_scored_avg: Some(1.8),
            goals_conceded_avg: Some(1.1),
            goals_variance: None, // absence is preserved, not substituted
            shots_on_target_avg: Some(4.9),
        };
        r.home_form = Some(full.clone());
        r.away_form = Some(full);
        r.h2h = Some(RawHeadToHead {
            meetings: Some(5),
            avg_total_goals: Some(2.7),
        });
        let p = build_prediction(&r).unwrap();
        assert!(!p.home_form.provider_default);
        assert!(!p.away_form.provider_default);
        assert!(!p.h2h.provider_default);
        assert!(!p.uses_fallback_stats());
    }

    #[test]
    fn test_partial_h2h_flagged_as_default() {
        let mut r = minimal_record("m1");
        r.h2h = Some(RawHeadToHead {
            meetings: None,
            avg_total_goals: Some(2.9),
        });
        let p = build_prediction(&r).unwrap();
        assert!(p.h2h.provider_default);
        assert_eq!(p.h2h.meetings, 0);
    }

    #[test]
    fn test_validate_day_isolates_bad_records() {
        let mut bad = minimal_record("bad");
        bad.odds = None;
        let records = vec![minimal_record("good1"), bad, minimal_record("good2")];

        let (predictions, skipped) = validate_day(&records);
        assert_eq!(predictions.len(), 2);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 1);
        assert_eq!(skipped[0].match_id.as_deref(), Some("bad"));
        assert!(skipped[0].reason.contains("odds"));
    }

    #[test]
    fn test_wire_json_deserializes() {
        let json = r#"{
            "match_id": "fx-100",
            "league": "EPL",
            "kickoff_time": "2026-08-25T14:00:00Z",
            "market": "home_over_0.5_goals",
            "odds": 1.07,
            "confidence": 0.93,
            "home_xg": 1.9,
            "away_xg": 0.8,
            "home_form": {
                "goals_scored_avg": 2.0,
                "goals_conceded_avg": 0.9,
                "goals_variance": 1.1,
                "shots_on_target_avg": 5.5
            },
            "h2h": { "meetings": 4, "avg_total_goals": 3.1 }
        }"#;
        let record: RawMatchRecord = serde_json::from_str(json).unwrap();
        let p = build_prediction(&record).unwrap();
        assert_eq!(p.market, MarketType::HomeOver05Goals);
        assert!(p.kickoff.is_some());
        assert!(!p.home_form.provider_default);
        assert!(p.away_form.provider_default);
        assert_eq!(p.h2h.meetings, 4);
    }

    #[test]
    fn test_pressure_index_clamped() {
        let mut r = minimal_record("m1");
        r.pressure_index = Some(1.8);
        let p = build_prediction(&r).unwrap();
        assert!((p.pressure_index - 1.0).abs() < 1e-10);
    }
}
