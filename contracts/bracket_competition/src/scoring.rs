//! Scoring engine.
//!
//! Every round is worth POINTS_PER_ROUND, split evenly (truncating) across
//! its matches. Only completed slots below `ending_slot` are scored, so the
//! live view grows as rounds are played. Scores are recomputed from the
//! ledger and the reverse index on every query.
//!
//! Weighted totals carry the payment multipliers at full fixed-point
//! precision: a participant weighs `points * multiplier`, a winning bucket
//! weighs `points * (members + sum of excess multipliers)`. Unpaid
//! competitions weigh everyone at exactly 1.0.

use core::ops::Range;

use soroban_sdk::{Address, Env, Map, Vec};

use crate::error::BracketError;
use crate::fixed::Fixed;
use crate::ledger;
use crate::predictions;
use crate::storage::{
    Competition, Outcome, Registration, POINTS_PER_ROUND, PPM_DENOMINATOR, SCOREBOARD_PAGE_LIMIT,
};

/// Plain bracket points and their multiplier-weighted counterpart
/// (weighted values are scaled by SCALE_FACTOR).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    pub points: i128,
    pub weighted: i128,
}

pub fn points_per_match(round: u32) -> i128 {
    let matches = ledger::match_count(round);
    if matches == 0 {
        return 0;
    }
    POINTS_PER_ROUND / matches as i128
}

/// One past the last slot that is scored.
pub fn ending_slot(competition: &Competition) -> u32 {
    if competition.finished {
        competition.team_count - 1
    } else {
        competition.team_count - ledger::match_count(competition.rounds_remaining)
    }
}

/// Rounds in view as `(round, slots)`, first round first.
///
/// `ending_slot` always falls on a round boundary, so a round is either
/// fully in view or not at all.
fn scored_rounds(competition: &Competition) -> impl Iterator<Item = (u32, Range<u32>)> {
    let team_count = competition.team_count;
    let ending = ending_slot(competition);
    (1..=competition.total_rounds)
        .rev()
        .map(move |round| {
            let start = ledger::round_start_index(team_count, round);
            (round, start..start + ledger::match_count(round))
        })
        .take_while(move |(_, slots)| slots.start < ending)
}

fn add_points(total: i128, per_match: i128, count: i128) -> Result<i128, BracketError> {
    per_match
        .checked_mul(count)
        .and_then(|p| total.checked_add(p))
        .ok_or(BracketError::Overflow)
}

/// Aggregate points over all winning buckets, one tally read per round.
pub fn total(env: &Env, competition: &Competition) -> Result<Tally, BracketError> {
    let outcomes = ledger::load(env)?;
    let mut total = Tally::default();

    for (round, slots) in scored_rounds(competition) {
        let per_match = points_per_match(round);
        let tally = predictions::tally(env, competition.team_count, round);
        for slot in slots {
            let winner = match ledger::winner_of(&outcomes, slot) {
                Some(winner) => winner,
                None => continue,
            };
            let (members, excess) = predictions::bucket_of(&tally, winner);
            let bucket_weight = Fixed::from_int(members as i128)?.checked_add(excess)?;
            total.points = add_points(total.points, per_match, members as i128)?;
            total.weighted = add_points(total.weighted, per_match, bucket_weight.raw())?;
        }
    }
    Ok(total)
}

/// Tally of one bracket against the outcomes.
pub fn bracket(
    competition: &Competition,
    outcomes: &Vec<Outcome>,
    registration: &Registration,
) -> Result<Tally, BracketError> {
    let mut points = 0;
    for (round, slots) in scored_rounds(competition) {
        let per_match = points_per_match(round);
        for slot in slots {
            let winner = ledger::winner_of(outcomes, slot);
            if winner.is_some() && winner == registration.predictions.get(slot) {
                points = add_points(points, per_match, 1)?;
            }
        }
    }
    Ok(Tally {
        points,
        weighted: points
            .checked_mul(registration.multiplier)
            .ok_or(BracketError::Overflow)?,
    })
}

/// Tally of a participant, zero when not registered.
pub fn participant(
    env: &Env,
    competition: &Competition,
    participant: &Address,
) -> Result<Tally, BracketError> {
    match predictions::registration(env, participant) {
        Some(registration) => bracket(competition, &ledger::load(env)?, &registration),
        None => Ok(Tally::default()),
    }
}

/// Share of the weighted total, in parts-per-million.
pub fn score_percent(
    env: &Env,
    competition: &Competition,
    participant: &Address,
) -> Result<i128, BracketError> {
    let own = self::participant(env, competition, participant)?;
    if own.weighted == 0 {
        return Ok(0);
    }
    let total = total(env, competition)?;
    if total.weighted == 0 {
        return Ok(0);
    }
    own.weighted
        .checked_mul(PPM_DENOMINATOR)
        .ok_or(BracketError::Overflow)?
        .checked_div(total.weighted)
        .ok_or(BracketError::Overflow)
}

/// Points of the participants at list positions `[start, start + limit)`
/// that scored. `limit` is capped at SCOREBOARD_PAGE_LIMIT.
pub fn scoreboard(
    env: &Env,
    competition: &Competition,
    start: u32,
    limit: u32,
) -> Result<Map<Address, i128>, BracketError> {
    let outcomes = ledger::load(env)?;
    let end = start
        .saturating_add(limit.min(SCOREBOARD_PAGE_LIMIT))
        .min(predictions::registered_count(env));

    let mut board = Map::new(env);
    for index in start..end {
        let participant =
            predictions::participant_at(env, index).ok_or(BracketError::StorageCorrupted)?;
        let registration = predictions::registration(env, &participant)
            .ok_or(BracketError::StorageCorrupted)?;
        let points = bracket(competition, &outcomes, &registration)?.points;
        if points > 0 {
            board.set(participant, points);
        }
    }
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::testutils::Address as _;
    use soroban_sdk::{vec, String};

    use crate::storage::{CompetitionKind, SCALE_FACTOR};

    fn competition(
        env: &Env,
        team_count: u32,
        rounds_remaining: u32,
        finished: bool,
    ) -> Competition {
        Competition {
            admin: Address::generate(env),
            kind: CompetitionKind::Predictable,
            name: String::from_str(env, "Cup"),
            banner: String::from_str(env, ""),
            team_count,
            total_rounds: team_count.trailing_zeros(),
            rounds_remaining,
            starting_time: 0,
            started_at: 0,
            expiration_time: u64::MAX,
            started: true,
            finished,
        }
    }

    fn empty_outcomes(env: &Env, team_count: u32) -> Vec<Outcome> {
        let mut outcomes = Vec::new(env);
        for _ in 0..team_count - 1 {
            outcomes.push_back(Outcome::default());
        }
        outcomes
    }

    fn registration(predictions: Vec<u32>, multiplier: i128) -> Registration {
        Registration {
            index: 0,
            predictions,
            multiplier,
            deposit: 0,
            claimed: false,
        }
    }

    #[test]
    fn test_points_per_match_truncates() {
        assert_eq!(points_per_match(1), POINTS_PER_ROUND);
        assert_eq!(points_per_match(2), POINTS_PER_ROUND / 2);
        // 1_000_000 / 128 = 7812.5, half a point of dust per match
        assert_eq!(points_per_match(8), 7_812);
        assert_eq!(points_per_match(0), 0);
    }

    #[test]
    fn test_ending_slot() {
        let env = Env::default();
        // 8 teams before any round: first round (slots 0..4) is in view
        assert_eq!(ending_slot(&competition(&env, 8, 3, false)), 4);
        assert_eq!(ending_slot(&competition(&env, 8, 2, false)), 6);
        assert_eq!(ending_slot(&competition(&env, 8, 1, false)), 7);
        assert_eq!(ending_slot(&competition(&env, 8, 0, true)), 7);
    }

    fn rounds_in_view(env: &Env, competition: &Competition) -> Vec<(u32, u32, u32)> {
        let mut seen = Vec::new(env);
        for (round, slots) in scored_rounds(competition) {
            seen.push_back((round, slots.start, slots.end));
        }
        seen
    }

    #[test]
    fn test_scored_rounds_stop_at_current_round() {
        let env = Env::default();
        assert_eq!(
            rounds_in_view(&env, &competition(&env, 8, 2, false)),
            vec![&env, (3, 0, 4), (2, 4, 6)]
        );
        assert_eq!(
            rounds_in_view(&env, &competition(&env, 8, 0, true)),
            vec![&env, (3, 0, 4), (2, 4, 6), (1, 6, 7)]
        );
    }

    #[test]
    fn test_bracket_uses_round_budget() {
        let env = Env::default();
        let c = competition(&env, 4, 0, true);
        let mut outcomes = empty_outcomes(&env, 4);
        ledger::complete(&mut outcomes, 0, 0).unwrap();
        ledger::complete(&mut outcomes, 1, 2).unwrap();
        ledger::complete(&mut outcomes, 2, 0).unwrap();

        let perfect = registration(vec![&env, 0, 2, 0], SCALE_FACTOR);
        assert_eq!(bracket(&c, &outcomes, &perfect).unwrap().points, 2 * POINTS_PER_ROUND);

        let final_only = registration(vec![&env, 1, 3, 0], 3 * SCALE_FACTOR / 2);
        let tally = bracket(&c, &outcomes, &final_only).unwrap();
        assert_eq!(tally.points, POINTS_PER_ROUND);
        assert_eq!(tally.weighted, POINTS_PER_ROUND * 3 * SCALE_FACTOR / 2);
    }

    #[test]
    fn test_incomplete_slots_are_skipped() {
        let env = Env::default();
        let c = competition(&env, 4, 2, false);
        let mut outcomes = empty_outcomes(&env, 4);
        ledger::complete(&mut outcomes, 1, 3).unwrap();

        let picks = registration(vec![&env, 0, 3, 0], SCALE_FACTOR);
        assert_eq!(bracket(&c, &outcomes, &picks).unwrap().points, POINTS_PER_ROUND / 2);
    }
}
