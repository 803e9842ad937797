//! Sprint quorum ("benchmark") monitor
//!
//! Decides whether enough members have swiped enough to end the sprint early.
//! All arithmetic is integer; percentages are whole numbers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::state::{Member, ParticipantId};

/// Thresholds for the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumRule {
    /// Swipes before a member counts
    pub min_swipes: u32,
    /// Counted members needed at all
    pub min_members: u32,
    /// Share of the expected swipe volume, in percent
    pub percent: u32,
}

impl Default for QuorumRule {
    fn default() -> Self {
        Self {
            min_swipes: 3,
            min_members: 2,
            percent: 80,
        }
    }
}

/// Benchmark evaluation for one snapshot of the members map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    /// Members with at least `min_swipes` swipes
    pub counted_members: u32,
    /// Swipes made by counted members
    pub total_swipes: u32,
    /// Swipe volume that meets the benchmark
    pub target: u32,
    /// Counted members who reached the per-person minimum
    pub members_at_min: u32,
    pub met: bool,
    /// Swipes still needed to reach `target`
    pub swipes_remaining: u32,
}

/// Evaluate the benchmark
///
/// Met when at least `min_members` members count and either their swipe
/// total reaches `ceil(percent × counted × min_swipes_per_person / 100)` or
/// at least `percent`% of them reached `min_swipes_per_person`.
pub fn evaluate(
    members: &BTreeMap<ParticipantId, Member>,
    min_swipes_per_person: u32,
    rule: QuorumRule,
) -> BenchmarkReport {
    let counted: Vec<&Member> = members
        .values()
        .filter(|m| m.is_counted(rule.min_swipes))
        .collect();

    let n = counted.len() as u64;
    let total: u64 = counted.iter().map(|m| u64::from(m.swipe_count)).sum();
    let at_min = counted
        .iter()
        .filter(|m| m.swipe_count >= min_swipes_per_person)
        .count() as u64;

    let percent = u64::from(rule.percent);
    let basis = n.max(u64::from(rule.min_members));
    let target = (percent * basis * u64::from(min_swipes_per_person)).div_ceil(100);

    let quorum = n >= u64::from(rule.min_members);
    let met = quorum && (total >= target || at_min * 100 >= percent * n);

    BenchmarkReport {
        counted_members: saturate(n),
        total_swipes: saturate(total),
        target: saturate(target),
        members_at_min: saturate(at_min),
        met,
        swipes_remaining: saturate(target.saturating_sub(total)),
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
