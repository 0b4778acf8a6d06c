//! Outcome ledger: the `N - 1` match slots and the round arithmetic over them.
//!
//! Rounds count down from `total_rounds` (first round) to 1 (final).
//! Round `r` owns the slots `[N - 2^r, N - 2^(r-1))`.

use soroban_sdk::{Env, Vec};

use crate::error::BracketError;
use crate::storage::{self, DataKey, Outcome};

/// Matches played in a round: `2^(rounds_remaining - 1)`.
pub fn match_count(rounds_remaining: u32) -> u32 {
    if rounds_remaining == 0 {
        return 0;
    }
    1 << (rounds_remaining - 1)
}

/// First slot of a round: `N - 2^rounds_remaining`.
pub fn round_start_index(team_count: u32, rounds_remaining: u32) -> u32 {
    team_count - (1 << rounds_remaining)
}

/// Round owning `slot`, or 0 when the slot is outside the bracket.
pub fn round_of(team_count: u32, slot: u32) -> u32 {
    if slot >= team_count.saturating_sub(1) {
        return 0;
    }
    // team_count - slot is in (2^(r-1), 2^r]
    let remaining = team_count - slot;
    32 - (remaining - 1).leading_zeros()
}

/// Whether `team_count` is a supported bracket size.
pub fn is_valid_team_count(team_count: u32) -> bool {
    team_count >= 2 && team_count <= storage::MAX_TEAMS && team_count.is_power_of_two()
}

pub fn total_rounds(team_count: u32) -> u32 {
    team_count.trailing_zeros()
}

/// Teams that can reach `slot`, as `(first team, count)`.
///
/// A slot of round `r` is fed by `N / 2^(r-1)` consecutive teams, so every
/// team belongs to exactly one slot per round.
pub fn slot_teams(team_count: u32, slot: u32) -> Option<(u32, u32)> {
    let round = round_of(team_count, slot);
    if round == 0 {
        return None;
    }
    let span = team_count / match_count(round);
    let position = slot - round_start_index(team_count, round);
    Some((position * span, span))
}

pub fn can_win(team_count: u32, slot: u32, team: u32) -> bool {
    match slot_teams(team_count, slot) {
        Some((first, span)) => team >= first && team - first < span,
        None => false,
    }
}

/// Winner of a completed slot.
pub fn winner_of(outcomes: &Vec<Outcome>, slot: u32) -> Option<u32> {
    match outcome(outcomes, slot) {
        Outcome {
            winner: Some(team),
            completed: true,
        } => Some(team),
        _ => None,
    }
}

/// The two teams meeting in `slot`.
///
/// First-round slots pair teams `2i` and `2i + 1`. Later slots are played
/// by the winners of their two feeder slots, which must be completed.
pub fn competitors(
    outcomes: &Vec<Outcome>,
    team_count: u32,
    slot: u32,
) -> Result<(u32, u32), BracketError> {
    let round = round_of(team_count, slot);
    if round == 0 {
        return Err(BracketError::InvalidSlot);
    }
    let position = slot - round_start_index(team_count, round);
    if round == total_rounds(team_count) {
        return Ok((2 * position, 2 * position + 1));
    }

    let feeder = round_start_index(team_count, round + 1) + 2 * position;
    let first = winner_of(outcomes, feeder).ok_or(BracketError::MatchNotCompleted)?;
    let second = winner_of(outcomes, feeder + 1).ok_or(BracketError::MatchNotCompleted)?;
    Ok((first, second))
}

/// Allocate an empty ledger of `team_count - 1` slots.
pub fn create(env: &Env, team_count: u32) {
    let mut outcomes = Vec::new(env);
    for _ in 0..team_count - 1 {
        outcomes.push_back(Outcome::default());
    }
    storage::set_persistent(env, &DataKey::Outcomes, &outcomes);
}

pub fn load(env: &Env) -> Result<Vec<Outcome>, BracketError> {
    storage::get_persistent(env, &DataKey::Outcomes).ok_or(BracketError::StorageCorrupted)
}

pub fn save(env: &Env, outcomes: &Vec<Outcome>) {
    storage::set_persistent(env, &DataKey::Outcomes, outcomes);
}

/// Single slot; out-of-range slots read as an empty outcome.
pub fn outcome(outcomes: &Vec<Outcome>, slot: u32) -> Outcome {
    outcomes.get(slot).unwrap_or_default()
}

/// Write a winner into a slot. Slots are write-once.
pub fn complete(outcomes: &mut Vec<Outcome>, slot: u32, winner: u32) -> Result<(), BracketError> {
    let current = outcomes.get(slot).ok_or(BracketError::InvalidSlot)?;
    if current.completed {
        return Err(BracketError::AlreadyCompleted);
    }
    outcomes.set(
        slot,
        Outcome {
            winner: Some(winner),
            completed: true,
        },
    );
    Ok(())
}
