//! Prediction registry and its reverse index.
//!
//! Each participant owns one `Registration` holding its full bracket and
//! stake. The reverse index is kept as one `RoundTally` per round: a team
//! can only reach one slot per round, so the bucket `(slot, team)` is the
//! team's entry in the tally of the slot's round. Registering, moving or
//! refunding a participant touches one tally per round, never one entry
//! per slot.

use soroban_sdk::{Address, Env, Vec};

use crate::error::BracketError;
use crate::fixed::Fixed;
use crate::ledger;
use crate::storage::{self, DataKey, Registration, RoundTally};

pub fn registration(env: &Env, participant: &Address) -> Option<Registration> {
    storage::get_persistent(env, &DataKey::Registration(participant.clone()))
}

pub fn is_registered(env: &Env, participant: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Registration(participant.clone()))
}

pub fn save(env: &Env, participant: &Address, registration: &Registration) {
    storage::set_persistent(env, &DataKey::Registration(participant.clone()), registration);
}

pub fn registered_count(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::RegisteredCount)
        .unwrap_or(0)
}

fn set_registered_count(env: &Env, count: u32) {
    env.storage()
        .instance()
        .set(&DataKey::RegisteredCount, &count);
}

pub fn participant_at(env: &Env, index: u32) -> Option<Address> {
    storage::get_persistent(env, &DataKey::Participant(index))
}

/// Tally of `round`, zeroed when nobody has registered yet.
pub fn tally(env: &Env, team_count: u32, round: u32) -> RoundTally {
    storage::get_persistent(env, &DataKey::RoundTally(round)).unwrap_or_else(|| {
        let mut members = Vec::new(env);
        let mut excess = Vec::new(env);
        for _ in 0..team_count {
            members.push_back(0u32);
            excess.push_back(0i128);
        }
        RoundTally { members, excess }
    })
}

/// Members and summed multiplier excess of the bucket `(slot, team)`.
pub fn bucket(env: &Env, team_count: u32, slot: u32, team: u32) -> (u32, Fixed) {
    if !ledger::can_win(team_count, slot, team) {
        return (0, Fixed::ZERO);
    }
    let tally = tally(env, team_count, ledger::round_of(team_count, slot));
    bucket_of(&tally, team)
}

pub fn bucket_of(tally: &RoundTally, team: u32) -> (u32, Fixed) {
    (
        tally.members.get(team).unwrap_or(0),
        Fixed::from_raw(tally.excess.get(team).unwrap_or(0)),
    )
}

fn add_bucket_excess(tally: &mut RoundTally, team: u32, delta: Fixed) -> Result<(), BracketError> {
    if delta == Fixed::ZERO {
        return Ok(());
    }
    let current = Fixed::from_raw(tally.excess.get(team).ok_or(BracketError::StorageCorrupted)?);
    tally.excess.set(team, current.checked_add(delta)?.raw());
    Ok(())
}

fn join(tally: &mut RoundTally, team: u32, excess: Fixed) -> Result<(), BracketError> {
    let members = tally.members.get(team).ok_or(BracketError::StorageCorrupted)?;
    tally
        .members
        .set(team, members.checked_add(1).ok_or(BracketError::Overflow)?);
    add_bucket_excess(tally, team, excess)
}

fn leave(tally: &mut RoundTally, team: u32, excess: Fixed) -> Result<(), BracketError> {
    let members = tally.members.get(team).ok_or(BracketError::StorageCorrupted)?;
    tally.members.set(
        team,
        members.checked_sub(1).ok_or(BracketError::StorageCorrupted)?,
    );
    add_bucket_excess(tally, team, Fixed::ZERO.checked_sub(excess)?)
}

/// Run `f(tally, slot)` over every slot, round by round. A round's tally is
/// written back only when `f` reported a change for one of its slots.
fn update_rounds<F>(env: &Env, team_count: u32, mut f: F) -> Result<(), BracketError>
where
    F: FnMut(&mut RoundTally, u32) -> Result<bool, BracketError>,
{
    for round in 1..=ledger::total_rounds(team_count) {
        let start = ledger::round_start_index(team_count, round);
        let mut tally = tally(env, team_count, round);
        let mut changed = false;
        for slot in start..start + ledger::match_count(round) {
            changed |= f(&mut tally, slot)?;
        }
        if changed {
            storage::set_persistent(env, &DataKey::RoundTally(round), &tally);
        }
    }
    Ok(())
}

/// Store a full bracket for `participant`, patching the reverse index.
///
/// New participants join one bucket per slot and keep `multiplier` and
/// `deposit` as their stake. Returning participants keep their stake and
/// only move between buckets on slots whose pick changed.
pub fn record(
    env: &Env,
    team_count: u32,
    participant: &Address,
    predictions: Vec<u32>,
    multiplier: Fixed,
    deposit: i128,
) -> Result<(), BracketError> {
    let updated = match registration(env, participant) {
        Some(mut existing) => {
            let excess = Fixed::from_raw(existing.multiplier).excess();
            let previous = existing.predictions.clone();
            update_rounds(env, team_count, |tally, slot| {
                let old_team = previous.get(slot).ok_or(BracketError::StorageCorrupted)?;
                let team = predictions
                    .get(slot)
                    .ok_or(BracketError::PredictionCountMismatch)?;
                if old_team == team {
                    return Ok(false);
                }
                leave(tally, old_team, excess)?;
                join(tally, team, excess)?;
                Ok(true)
            })?;
            existing.predictions = predictions;
            existing
        }
        None => {
            let excess = multiplier.excess();
            update_rounds(env, team_count, |tally, slot| {
                let team = predictions
                    .get(slot)
                    .ok_or(BracketError::PredictionCountMismatch)?;
                join(tally, team, excess)?;
                Ok(true)
            })?;

            let index = registered_count(env);
            storage::set_persistent(env, &DataKey::Participant(index), participant);
            set_registered_count(env, index + 1);
            Registration {
                index,
                predictions,
                multiplier: multiplier.raw(),
                deposit,
                claimed: false,
            }
        }
    };

    save(env, participant, &updated);
    Ok(())
}

/// Add `extra` multiplier excess to every bucket the participant sits in.
pub fn add_excess(
    env: &Env,
    team_count: u32,
    registration: &Registration,
    extra: Fixed,
) -> Result<(), BracketError> {
    if extra == Fixed::ZERO {
        return Ok(());
    }
    update_rounds(env, team_count, |tally, slot| {
        let team = registration
            .predictions
            .get(slot)
            .ok_or(BracketError::StorageCorrupted)?;
        add_bucket_excess(tally, team, extra)?;
        Ok(true)
    })
}

/// Drop a participant from the registry and every bucket.
///
/// The last participant takes the freed list index.
pub fn unregister(
    env: &Env,
    team_count: u32,
    participant: &Address,
) -> Result<Registration, BracketError> {
    let removed = registration(env, participant).ok_or(BracketError::NotRegistered)?;
    let excess = Fixed::from_raw(removed.multiplier).excess();
    update_rounds(env, team_count, |tally, slot| {
        let team = removed
            .predictions
            .get(slot)
            .ok_or(BracketError::StorageCorrupted)?;
        leave(tally, team, excess)?;
        Ok(true)
    })?;

    let last = registered_count(env)
        .checked_sub(1)
        .ok_or(BracketError::StorageCorrupted)?;
    if removed.index != last {
        let moved = participant_at(env, last).ok_or(BracketError::StorageCorrupted)?;
        let mut moved_registration =
            registration(env, &moved).ok_or(BracketError::StorageCorrupted)?;
        moved_registration.index = removed.index;
        save(env, &moved, &moved_registration);
        storage::set_persistent(env, &DataKey::Participant(removed.index), &moved);
    }
    storage::remove_persistent(env, &DataKey::Participant(last));
    storage::remove_persistent(env, &DataKey::Registration(participant.clone()));
    set_registered_count(env, last);
    Ok(removed)
}
