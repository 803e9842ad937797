//! Deathmatch vote resolver
//!
//! One current vote per participant. Switching moves the vote between
//! buckets so `votes_a + votes_b` always equals the number of voters.

use crate::state::{Choice, DeathmatchInfo, DecidedBy};

/// What a vote did to the tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// Same as the participant's current vote
    Unchanged,
    /// First vote from this participant
    Cast,
    /// Moved from another choice
    Switched { from: Choice },
}

impl VoteChange {
    pub fn previous(self) -> Option<Choice> {
        match self {
            VoteChange::Switched { from } => Some(from),
            _ => None,
        }
    }
}

fn bucket(dm: &mut DeathmatchInfo, choice: Choice) -> &mut u32 {
    match choice {
        Choice::A => &mut dm.votes_a,
        Choice::B => &mut dm.votes_b,
    }
}

/// Apply a vote, keeping the counters in step with `voters`
pub fn apply_vote(dm: &mut DeathmatchInfo, participant_id: &str, choice: Choice) -> VoteChange {
    let previous = dm.voters.get(participant_id).copied();
    let change = match previous {
        Some(prev) if prev == choice => return VoteChange::Unchanged,
        Some(prev) => {
            let old = bucket(dm, prev);
            *old = old.saturating_sub(1);
            VoteChange::Switched { from: prev }
        }
        None => VoteChange::Cast,
    };

    *bucket(dm, choice) += 1;
    dm.voters.insert(participant_id.to_string(), choice);
    change
}

/// Votes needed to win outright: a strict majority of counted members
pub fn majority(counted_members: usize) -> u32 {
    u32::try_from(counted_members / 2 + 1).unwrap_or(u32::MAX)
}

/// The choice holding a majority, if any
pub fn majority_winner(dm: &DeathmatchInfo, counted_members: usize) -> Option<Choice> {
    let needed = majority(counted_members);
    if dm.votes_a >= needed {
        Some(Choice::A)
    } else if dm.votes_b >= needed {
        Some(Choice::B)
    } else {
        None
    }
}

/// Resolution when the deathmatch is cut short
///
/// An explicit host choice wins outright. Otherwise the choice with strictly
/// more votes wins, and a tie goes to A.
pub fn forced_winner(dm: &DeathmatchInfo, host_choice: Option<Choice>) -> (Choice, DecidedBy) {
    if let Some(choice) = host_choice {
        return (choice, DecidedBy::Host);
    }
    if dm.votes_b > dm.votes_a {
        (Choice::B, DecidedBy::Vote)
    } else {
        (Choice::A, DecidedBy::Vote)
    }
}

/// Check that the counters agree with the voters map
pub fn is_consistent(dm: &DeathmatchInfo) -> bool {
    let a = dm.voters.values().filter(|c| **c == Choice::A).count();
    let b = dm.voters.len() - a;
    dm.votes_a as usize == a && dm.votes_b as usize == b
}
