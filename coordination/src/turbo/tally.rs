//! Swipe tally and top-2 selection
//!
//! Pure functions over swipe records. Candidates rank by approval rating,
//! then by total swipe volume, then by ID so the order is fully deterministic.
//! Approval comparisons cross-multiply integer counts instead of comparing
//! floats.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::state::{CandidateSummary, SwipeDecision, SwipeRecord};

/// Group swipes by candidate and count yes/no decisions
///
/// The returned summaries are ordered by candidate ID. Name and rating come
/// from the most recent swipe that carried them.
pub fn tally(swipes: &[SwipeRecord]) -> Vec<CandidateSummary> {
    let mut by_candidate: BTreeMap<&str, (CandidateSummary, chrono::DateTime<chrono::Utc>)> =
        BTreeMap::new();

    for swipe in swipes {
        let (summary, latest) = by_candidate
            .entry(swipe.activity_id.as_str())
            .or_insert_with(|| {
                (
                    CandidateSummary::new(&swipe.activity_id, &swipe.activity_name),
                    swipe.timestamp,
                )
            });

        match swipe.decision {
            SwipeDecision::Yes => summary.yes_count += 1,
            SwipeDecision::No => summary.no_count += 1,
        }

        let newest = swipe.timestamp >= *latest;
        if newest {
            *latest = swipe.timestamp;
            if !swipe.activity_name.is_empty() {
                summary.name = swipe.activity_name.clone();
            }
        }
        if swipe.rating.is_some() && (newest || summary.rating.is_none()) {
            summary.rating = swipe.rating;
        }
    }

    by_candidate.into_values().map(|(summary, _)| summary).collect()
}

/// Ranking order: higher approval first, then more total votes, then lower ID
pub fn compare(a: &CandidateSummary, b: &CandidateSummary) -> Ordering {
    compare_approval(b, a)
        .then_with(|| b.total_votes().cmp(&a.total_votes()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Compare yes/total ratios exactly; a candidate with no votes has approval 0
fn compare_approval(a: &CandidateSummary, b: &CandidateSummary) -> Ordering {
    let (a_yes, a_total) = ratio(a);
    let (b_yes, b_total) = ratio(b);
    (a_yes * b_total).cmp(&(b_yes * a_total))
}

fn ratio(c: &CandidateSummary) -> (u64, u64) {
    match c.total_votes() {
        0 => (0, 1),
        total => (u64::from(c.yes_count), u64::from(total)),
    }
}

/// Tally and sort candidates best-first
pub fn rank(swipes: &[SwipeRecord]) -> Vec<CandidateSummary> {
    let mut ranked = tally(swipes);
    ranked.sort_by(compare);
    ranked
}

/// Outcome of top-2 selection
#[derive(Debug, Clone, PartialEq)]
pub enum TopSelection {
    /// Two candidates, best first
    Pair([CandidateSummary; 2]),
    /// Only one candidate was swiped
    Single(CandidateSummary),
    /// Nothing was swiped
    Empty,
}

impl TopSelection {
    /// Number of candidates found, capped at two
    pub fn found(&self) -> usize {
        match self {
            TopSelection::Pair(_) => 2,
            TopSelection::Single(_) => 1,
            TopSelection::Empty => 0,
        }
    }
}

/// Pick the two best-ranked candidates
pub fn select_top2(swipes: &[SwipeRecord]) -> TopSelection {
    let mut ranked = rank(swipes).into_iter();
    match (ranked.next(), ranked.next()) {
        (Some(first), Some(second)) => TopSelection::Pair([first, second]),
        (Some(only), None) => TopSelection::Single(only),
        _ => TopSelection::Empty,
    }
}
