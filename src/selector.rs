//! Greedy feasibility selection of candidate visits.
//!
//! Picks a high-score subset of scored time slots such that every
//! consecutive pair leaves room for the dwell time plus the travel
//! between the two places. Greedy and without backtracking: a skipped
//! candidate is discarded permanently, so the result is feasible but
//! not guaranteed globally optimal.

use chrono::NaiveDateTime;

use crate::traits::TravelTimeProvider;

/// A scored visit slot produced by the candidate sweep.
#[derive(Debug, Clone)]
pub struct CandidateVisit {
    /// Canonical place title.
    pub place: String,
    pub when: NaiveDateTime,
    /// Predicted busyness, 0-100.
    pub crowd_level: u8,
    /// Ranking score, higher is better.
    pub score: i32,
    /// Human-readable reason tags.
    pub reasons: Vec<String>,
}

/// Select up to `max_stops` candidates, best score first.
///
/// Candidates are walked in descending score order (stable, so equal
/// scores keep their input order). The first is accepted
/// unconditionally; each later one is accepted only if the time gap to
/// the most recently accepted candidate covers the dwell time plus the
/// travel time between the two places. Unknown travel time counts as
/// zero extra minutes.
pub fn select<T: TravelTimeProvider>(
    candidates: &[CandidateVisit],
    dwell_minutes: i64,
    travel: &T,
    max_stops: usize,
) -> Vec<CandidateVisit> {
    if max_stops == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<&CandidateVisit> = candidates.iter().collect();
    ranked.sort_by_key(|candidate| std::cmp::Reverse(candidate.score));

    let mut chosen: Vec<CandidateVisit> = Vec::new();
    for candidate in ranked {
        if chosen.len() >= max_stops {
            break;
        }
        let Some(last) = chosen.last() else {
            chosen.push(candidate.clone());
            continue;
        };

        let gap_minutes = (candidate.when - last.when).num_minutes();
        let travel_minutes = travel
            .minutes_between(&last.place, &candidate.place)
            .unwrap_or(0);
        if gap_minutes >= dwell_minutes + travel_minutes {
            chosen.push(candidate.clone());
        }
    }

    chosen
}
