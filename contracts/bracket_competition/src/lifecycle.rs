//! Competition lifecycle guards.
//!
//! Created -> Live -> Finished, with Expired reachable from Created and Live.
//! Expiration is a time predicate checked here, never a stored flag.

use soroban_sdk::{Address, Env};

use crate::error::BracketError;
use crate::storage::Competition;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Created,
    Live,
    Finished,
    Expired,
}

pub fn is_expired(env: &Env, competition: &Competition) -> bool {
    env.ledger().timestamp() > competition.expiration_time
}

pub fn phase(env: &Env, competition: &Competition) -> Phase {
    if competition.finished {
        Phase::Finished
    } else if is_expired(env, competition) {
        Phase::Expired
    } else if competition.started {
        Phase::Live
    } else {
        Phase::Created
    }
}

/// Registration window: not started and not expired.
pub fn require_created(env: &Env, competition: &Competition) -> Result<(), BracketError> {
    match phase(env, competition) {
        Phase::Created => Ok(()),
        Phase::Live | Phase::Finished => Err(BracketError::AlreadyStarted),
        Phase::Expired => Err(BracketError::Expired),
    }
}

pub fn require_live(env: &Env, competition: &Competition) -> Result<(), BracketError> {
    match phase(env, competition) {
        Phase::Live => Ok(()),
        Phase::Expired => Err(BracketError::Expired),
        Phase::Created | Phase::Finished => Err(BracketError::NotLive),
    }
}

pub fn require_finished(env: &Env, competition: &Competition) -> Result<(), BracketError> {
    match phase(env, competition) {
        Phase::Finished => Ok(()),
        _ => Err(BracketError::NotFinished),
    }
}

/// Expired without finishing, the only phase that allows refunds.
pub fn require_expired(env: &Env, competition: &Competition) -> Result<(), BracketError> {
    match phase(env, competition) {
        Phase::Expired => Ok(()),
        Phase::Finished => Err(BracketError::AlreadyFinished),
        Phase::Created | Phase::Live => Err(BracketError::NotExpired),
    }
}

pub fn require_admin(competition: &Competition, caller: &Address) -> Result<(), BracketError> {
    if *caller != competition.admin {
        return Err(BracketError::Unauthorized);
    }
    caller.require_auth();
    Ok(())
}

/// Move past the current round; the last advance finishes the competition.
pub fn advance(competition: &mut Competition) -> Result<(), BracketError> {
    if competition.rounds_remaining == 0 {
        return Err(BracketError::NoRoundsRemaining);
    }
    competition.rounds_remaining -= 1;
    if competition.rounds_remaining == 0 {
        competition.finished = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::testutils::{Address as _, Ledger};
    use soroban_sdk::String;

    use crate::storage::CompetitionKind;

    fn competition(env: &Env, team_count: u32, expiration_time: u64) -> Competition {
        let rounds = team_count.trailing_zeros();
        Competition {
            admin: Address::generate(env),
            kind: CompetitionKind::Base,
            name: String::from_str(env, "Cup"),
            banner: String::from_str(env, "ipfs://banner"),
            team_count,
            total_rounds: rounds,
            rounds_remaining: rounds,
            starting_time: 100,
            started_at: 0,
            expiration_time,
            started: false,
            finished: false,
        }
    }

    #[test]
    fn test_phase_transitions() {
        let env = Env::default();
        env.ledger().set_timestamp(50);
        let mut c = competition(&env, 4, 1_000);

        assert_eq!(phase(&env, &c), Phase::Created);
        c.started = true;
        assert_eq!(phase(&env, &c), Phase::Live);

        env.ledger().set_timestamp(1_000);
        assert_eq!(phase(&env, &c), Phase::Live);
        env.ledger().set_timestamp(1_001);
        assert_eq!(phase(&env, &c), Phase::Expired);

        // Finishing wins over expiration
        c.finished = true;
        assert_eq!(phase(&env, &c), Phase::Finished);
    }

    #[test]
    fn test_unstarted_competition_can_expire() {
        let env = Env::default();
        env.ledger().set_timestamp(2_000);
        let c = competition(&env, 2, 1_000);
        assert_eq!(phase(&env, &c), Phase::Expired);
        assert_eq!(require_created(&env, &c), Err(BracketError::Expired));
        assert_eq!(require_expired(&env, &c), Ok(()));
    }

    #[test]
    fn test_advance_halves_until_finished() {
        let env = Env::default();
        let mut c = competition(&env, 8, u64::MAX);
        c.started = true;

        let mut previous = c.rounds_remaining;
        while !c.finished {
            advance(&mut c).unwrap();
            assert_eq!(c.rounds_remaining, previous - 1);
            previous = c.rounds_remaining;
        }
        assert_eq!(c.rounds_remaining, 0);
        assert_eq!(advance(&mut c), Err(BracketError::NoRoundsRemaining));
        assert!(c.finished);
    }
}
