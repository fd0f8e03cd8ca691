//! Combo selection.
//!
//! Bounded combinatorial search over the day's admitted picks: every
//! subset of size 1 to 3 is enumerated, kept when its combined odds land
//! inside the target band, and ranked by a fixed composite key. Daily
//! admitted counts are low tens at most, so exhaustive enumeration is
//! cheap by construction — this is a bounded-N filter, not a knapsack
//! solver.
//!
//! Ranking (total order, so the result is deterministic regardless of
//! input ordering): combined confidence descending, then distance to the
//! band midpoint ascending, then fewer legs, then the lexicographic list
//! of leg match-ids.

use std::cmp::Ordering;
use tracing::debug;

use crate::config::{BandConfig, ConfidenceAggregation, SelectorConfig};
use crate::types::{Combo, ComboLeg, FilteredPick, Recommendation};

/// Reason text for the explicit empty result.
pub const NO_COMBO_REASON: &str = "no combination met the odds band today";

/// Searches admitted picks for the best in-band combo.
pub struct ComboSelector {
    band: BandConfig,
    config: SelectorConfig,
}

/// A candidate subset under evaluation, with its ranking keys.
struct Candidate {
    indices: Vec<usize>,
    total_odds: f64,
    confidence: f64,
    midpoint_distance: f64,
    /// Sorted leg ids joined for the final lexicographic tie-break.
    id_key: String,
}

impl ComboSelector {
    pub fn new(band: BandConfig, config: SelectorConfig) -> Self {
        Self { band, config }
    }

    pub fn band(&self) -> &BandConfig {
        &self.band
    }

    /// The top-ranked 1–3-leg subset inside the band, or None.
    pub fn select(&self, picks: &[FilteredPick]) -> Option<Combo> {
        let mut best: Option<Candidate> = None;
        let n = picks.len();

        // Iterative enumeration up to three legs; no recursion needed at
        // this cardinality.
        for i in 0..n {
            self.consider(picks, vec![i], &mut best);
            for j in (i + 1)..n {
                self.consider(picks, vec![i, j], &mut best);
                for k in (j + 1)..n {
                    self.consider(picks, vec![i, j, k], &mut best);
                }
            }
        }

        best.map(|c| self.build_combo(picks, c))
    }

    /// Wrap `select` in the externally consumed recommendation shape.
    pub fn recommend(&self, picks: &[FilteredPick]) -> Recommendation {
        match self.select(picks) {
            Some(combo) => Recommendation::Combo(combo),
            None => Recommendation::Empty {
                reason: NO_COMBO_REASON.to_string(),
            },
        }
    }

    fn consider(&self, picks: &[FilteredPick], indices: Vec<usize>, best: &mut Option<Candidate>) {
        let total_odds: f64 = indices.iter().map(|&i| picks[i].prediction.odds).product();
        if total_odds < self.band.min_odds || total_odds > self.band.max_odds {
            return;
        }

        let confidence = self.combined_confidence(picks, &indices);
        let mut ids: Vec<&str> = indices
            .iter()
            .map(|&i| picks[i].prediction.match_id.as_str())
            .collect();
        ids.sort_unstable();

        let candidate = Candidate {
            total_odds,
            confidence,
            midpoint_distance: (total_odds - self.band.midpoint()).abs(),
            id_key: ids.join("|"),
            indices,
        };

        let better = match best {
            None => true,
            Some(current) => rank(&candidate, current) == Ordering::Less,
        };
        if better {
            debug!(
                legs = candidate.indices.len(),
                total_odds = format!("{:.4}", candidate.total_odds),
                confidence = format!("{:.4}", candidate.confidence),
                "New best candidate"
            );
            *best = Some(candidate);
        }
    }

    fn combined_confidence(&self, picks: &[FilteredPick], indices: &[usize]) -> f64 {
        let product: f64 = indices
            .iter()
            .map(|&i| picks[i].prediction.confidence)
            .product();
        match self.config.confidence_aggregation {
            ConfidenceAggregation::Product => product,
            ConfidenceAggregation::GeometricMean => product.powf(1.0 / indices.len() as f64),
        }
    }

    fn build_combo(&self, picks: &[FilteredPick], candidate: Candidate) -> Combo {
        let legs: Vec<ComboLeg> = candidate
            .indices
            .iter()
            .map(|&i| {
                let p = &picks[i].prediction;
                ComboLeg {
                    match_id: p.match_id.clone(),
                    market: p.market,
                    odds: p.odds,
                    confidence: p.confidence,
                }
            })
            .collect();

        let worst_safety = candidate
            .indices
            .iter()
            .map(|&i| picks[i].outcome.safety_score)
            .fold(f64::INFINITY, f64::min);

        let safety_rationale = format!(
            "{} leg(s) at {:.4} total odds inside [{:.2}, {:.2}]; combined confidence {:.1}%; every leg survives the worst-case catalogue (lowest safety score {:.2})",
            legs.len(),
            candidate.total_odds,
            self.band.min_odds,
            self.band.max_odds,
            candidate.confidence * 100.0,
            worst_safety,
        );

        Combo {
            legs,
            total_odds: candidate.total_odds,
            combined_confidence: candidate.confidence,
            safety_rationale,
        }
    }
}

/// The fixed composite ranking. `Less` means `a` outranks `b`.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then(
            a.midpoint_distance
                .partial_cmp(&b.midpoint_distance)
                .unwrap_or(Ordering::Equal),
        )
        .then(a.indices.len().cmp(&b.indices.len()))
        .then(a.id_key.cmp(&b.id_key))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
