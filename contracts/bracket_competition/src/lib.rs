#![no_std]

mod error;
mod events;
mod fixed;
mod ledger;
mod lifecycle;
mod predictions;
mod scoring;
mod settlement;
mod storage;


pub use error::BracketError;
pub use storage::{
    Competition, CompetitionKind, CompetitionParams, FeeParams, Outcome, Registration,
};

use fixed::Fixed;
use soroban_sdk::{contract, contractimpl, log, Address, Env, Map, String, Vec};
use storage::{DataKey, NEVER_EXPIRES, PPM_DENOMINATOR};

/// Bracket Competition Contract
///
/// One single-elimination bracket. Participants submit a full set of
/// match-winner predictions before the start; the administrator resolves
/// matches round by round; predictions are scored against the outcomes.
///
/// Key features:
/// - Outcome ledger of N - 1 write-once slots, addressed round by round
/// - Full-bracket predictions with a per-round reverse index for scoring
/// - Paid competitions escrow entry fees; overpaying raises the
///   participant's multiplier and share of the prize pool
/// - Winners claim rewards, the administrator claims the protocol fee,
///   and participants of an expired competition are refunded
#[contract]
pub struct BracketCompetition;

#[contractimpl]
impl BracketCompetition {
    /// Constructor: records the factory allowed to initialize this instance.
    pub fn __constructor(env: Env, factory: Address) {
        env.storage().instance().set(&DataKey::Factory, &factory);
    }

    /// Initialize the competition. Factory only, once.
    ///
    /// # Arguments
    /// * `params` - Administrator, kind, metadata, teams and schedule
    /// * `fee` - Entry fee config, required for paid competitions only
    pub fn initialize(
        env: Env,
        params: CompetitionParams,
        fee: Option<FeeParams>,
    ) -> Result<(), BracketError> {
        let factory: Address = env
            .storage()
            .instance()
            .get(&DataKey::Factory)
            .ok_or(BracketError::NotInitialized)?;
        factory.require_auth();

        if env.storage().instance().has(&DataKey::Competition) {
            return Err(BracketError::AlreadyInitialized);
        }

        if params.starting_time <= env.ledger().timestamp() {
            return Err(BracketError::InvalidStartTime);
        }
        if !ledger::is_valid_team_count(params.team_count) {
            return Err(BracketError::InvalidTeamCount);
        }
        if params.team_names.len() != params.team_count {
            return Err(BracketError::TeamCountMismatch);
        }

        let expiration_time = match params.expiration_time {
            Some(expiration) if expiration <= params.starting_time => {
                return Err(BracketError::InvalidExpiration)
            }
            Some(expiration) => expiration,
            None if params.kind == CompetitionKind::PaidPredictable => {
                return Err(BracketError::InvalidExpiration)
            }
            None => NEVER_EXPIRES,
        };

        match (params.kind, &fee) {
            (CompetitionKind::PaidPredictable, Some(fee)) => {
                if fee.amount < 0 {
                    return Err(BracketError::InvalidFee);
                }
                if fee.protocol_fee_ppm as i128 > PPM_DENOMINATOR {
                    return Err(BracketError::InvalidProtocolFee);
                }
            }
            (CompetitionKind::PaidPredictable, None) | (_, Some(_)) => {
                return Err(BracketError::InvalidFee)
            }
            _ => {}
        }

        let total_rounds = ledger::total_rounds(params.team_count);
        let competition = Competition {
            admin: params.admin.clone(),
            kind: params.kind,
            name: params.name,
            banner: params.banner,
            team_count: params.team_count,
            total_rounds,
            rounds_remaining: total_rounds,
            starting_time: params.starting_time,
            started_at: 0,
            expiration_time,
            started: false,
            finished: false,
        };

        storage::set_competition(&env, &competition);
        storage::set_persistent(&env, &DataKey::TeamNames, &params.team_names);
        ledger::create(&env, params.team_count);
        if let Some(fee) = fee {
            env.storage().instance().set(&DataKey::Fee, &fee);
            storage::set_instance_i128(&env, &DataKey::TotalReserves, 0);
        }
        storage::bump_instance(&env);

        events::initialized(&env, &params.admin, params.team_count);
        Ok(())
    }

    /// Start the competition (admin only). Closes registration.
    pub fn start(env: Env, admin: Address) -> Result<(), BracketError> {
        let mut competition = storage::competition(&env)?;
        lifecycle::require_admin(&competition, &admin)?;
        lifecycle::require_created(&env, &competition)?;

        competition.started = true;
        competition.started_at = env.ledger().timestamp();
        storage::set_competition(&env, &competition);
        storage::bump_instance(&env);

        log!(&env, "competition started", competition.started_at);
        events::started(&env, competition.started_at);
        Ok(())
    }

    /// Replace the team names (admin only, before start).
    pub fn set_team_names(
        env: Env,
        admin: Address,
        names: Vec<String>,
    ) -> Result<(), BracketError> {
        let competition = storage::competition(&env)?;
        lifecycle::require_admin(&competition, &admin)?;
        lifecycle::require_created(&env, &competition)?;

        if names.len() != competition.team_count {
            return Err(BracketError::TeamCountMismatch);
        }
        storage::set_persistent(&env, &DataKey::TeamNames, &names);
        Ok(())
    }

    /// Record the winner of one match of the current round (admin only).
    ///
    /// `winner` is a team id and must be one of the two teams playing in
    /// `slot`.
    pub fn complete_match(
        env: Env,
        admin: Address,
        slot: u32,
        winner: u32,
    ) -> Result<(), BracketError> {
        let competition = storage::competition(&env)?;
        lifecycle::require_admin(&competition, &admin)?;
        lifecycle::require_live(&env, &competition)?;

        if ledger::round_of(competition.team_count, slot) != competition.rounds_remaining {
            return Err(BracketError::InvalidSlot);
        }

        let mut outcomes = ledger::load(&env)?;
        let (first, second) = ledger::competitors(&outcomes, competition.team_count, slot)?;
        if winner != first && winner != second {
            return Err(BracketError::InvalidTeam);
        }
        ledger::complete(&mut outcomes, slot, winner)?;
        ledger::save(&env, &outcomes);

        events::match_completed(&env, slot, winner);
        Ok(())
    }

    /// Close the current round once every match in it is completed (admin only).
    pub fn advance_round(env: Env, admin: Address) -> Result<(), BracketError> {
        let mut competition = storage::competition(&env)?;
        lifecycle::require_admin(&competition, &admin)?;
        lifecycle::require_live(&env, &competition)?;
        if competition.rounds_remaining == 0 {
            return Err(BracketError::NoRoundsRemaining);
        }

        let outcomes = ledger::load(&env)?;
        let start =
            ledger::round_start_index(competition.team_count, competition.rounds_remaining);
        for slot in start..start + ledger::match_count(competition.rounds_remaining) {
            if !ledger::outcome(&outcomes, slot).completed {
                return Err(BracketError::MatchNotCompleted);
            }
        }

        Self::finish_round(&env, &mut competition)
    }

    /// Write the results of the current round and close it (admin only).
    ///
    /// `results[i]` names the winner of the i-th match of the round by side:
    /// 0 for the first competitor, 1 for the second. Matches already
    /// completed through `complete_match` keep their winner.
    pub fn advance_round_with_results(
        env: Env,
        admin: Address,
        results: Vec<u32>,
    ) -> Result<(), BracketError> {
        let mut competition = storage::competition(&env)?;
        lifecycle::require_admin(&competition, &admin)?;
        lifecycle::require_live(&env, &competition)?;
        if competition.rounds_remaining == 0 {
            return Err(BracketError::NoRoundsRemaining);
        }

        let matches = ledger::match_count(competition.rounds_remaining);
        if results.len() != matches {
            return Err(BracketError::ResultCountMismatch);
        }
        if results.iter().any(|side| side > 1) {
            return Err(BracketError::InvalidTeam);
        }

        let mut outcomes = ledger::load(&env)?;
        let start =
            ledger::round_start_index(competition.team_count, competition.rounds_remaining);
        for (i, side) in results.iter().enumerate() {
            let slot = start + i as u32;
            if ledger::outcome(&outcomes, slot).completed {
                continue;
            }
            let (first, second) = ledger::competitors(&outcomes, competition.team_count, slot)?;
            let winner = if side == 0 { first } else { second };
            ledger::complete(&mut outcomes, slot, winner)?;
            events::match_completed(&env, slot, winner);
        }
        ledger::save(&env, &outcomes);

        Self::finish_round(&env, &mut competition)
    }

    /// Submit or replace a full bracket of predictions.
    ///
    /// # Arguments
    /// * `participant` - Owner of the bracket (must authorize)
    /// * `predictions` - Predicted winner (team id) for each of the N - 1
    ///                   slots; each pick must come from the teams feeding
    ///                   that slot
    /// * `payment` - Entry payment pulled into escrow; first registration
    ///               of a paid competition only, 0 otherwise
    pub fn submit_predictions(
        env: Env,
        participant: Address,
        predictions: Vec<u32>,
        payment: i128,
    ) -> Result<(), BracketError> {
        let competition = storage::competition(&env)?;
        if competition.kind == CompetitionKind::Base {
            return Err(BracketError::PredictionsDisabled);
        }
        lifecycle::require_created(&env, &competition)?;

        if predictions.len() != competition.team_count - 1 {
            return Err(BracketError::PredictionCountMismatch);
        }
        let team_count = competition.team_count;
        for (slot, team) in predictions.iter().enumerate() {
            if !ledger::can_win(team_count, slot as u32, team) {
                return Err(BracketError::InvalidTeam);
            }
        }

        participant.require_auth();

        let (multiplier, deposit) = match competition.kind {
            CompetitionKind::PaidPredictable => {
                settlement::accept_registration(&env, &participant, payment)?
            }
            _ if payment != 0 => return Err(BracketError::UnexpectedDeposit),
            _ => (Fixed::ONE, 0),
        };
        predictions::record(&env, team_count, &participant, predictions, multiplier, deposit)?;
        storage::bump_instance(&env);

        events::registered(&env, &participant, multiplier.raw());
        Ok(())
    }

    /// Convert a new deposit into extra multiplier (paid competitions).
    ///
    /// Only allowed before the start. Once matches can be scored the
    /// multipliers and the reverse index are frozen, so every score share
    /// and payout is computed against the same weights.
    ///
    /// # Returns
    /// The participant's updated multiplier, scaled by 10^7
    pub fn increase_multiplier(
        env: Env,
        participant: Address,
        payment: i128,
    ) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        if competition.kind != CompetitionKind::PaidPredictable {
            return Err(BracketError::NoFeeConfigured);
        }
        participant.require_auth();

        let updated = settlement::increase_multiplier(&env, &competition, &participant, payment)?;
        storage::bump_instance(&env);
        Ok(updated.raw())
    }

    /// Claim the participant's share of the prize pool after the final.
    ///
    /// # Returns
    /// Amount transferred to the participant
    pub fn claim_rewards(env: Env, participant: Address) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        participant.require_auth();

        let amount = settlement::claim_rewards(&env, &competition, &participant)?;
        log!(&env, "rewards claimed", participant, amount);
        Ok(amount)
    }

    /// Pay the protocol fee to the administrator (admin only, once).
    pub fn claim_protocol_fees(env: Env, admin: Address) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        lifecycle::require_admin(&competition, &admin)?;

        let amount = settlement::claim_protocol_fees(&env, &competition)?;
        log!(&env, "protocol fees claimed", amount);
        Ok(amount)
    }

    /// Refund the participant's whole deposit after the competition expired
    /// unfinished.
    pub fn refund_registration_fee(env: Env, participant: Address) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        participant.require_auth();

        let amount = settlement::refund_registration_fee(&env, &competition, &participant)?;
        log!(&env, "registration refunded", participant, amount);
        Ok(amount)
    }

    // --- Queries ---

    pub fn get_competition(env: Env) -> Result<Competition, BracketError> {
        storage::competition(&env)
    }

    pub fn get_factory(env: Env) -> Result<Address, BracketError> {
        env.storage()
            .instance()
            .get(&DataKey::Factory)
            .ok_or(BracketError::NotInitialized)
    }

    /// Full outcome ledger.
    pub fn get_bracket_progression(env: Env) -> Result<Vec<Outcome>, BracketError> {
        storage::competition(&env)?;
        ledger::load(&env)
    }

    /// Single slot; out-of-range slots return an empty outcome.
    pub fn get_outcome(env: Env, slot: u32) -> Result<Outcome, BracketError> {
        storage::competition(&env)?;
        Ok(ledger::outcome(&ledger::load(&env)?, slot))
    }

    /// Slot range of the current round.
    ///
    /// # Returns
    /// (first slot, match count); (N - 1, 0) once finished
    pub fn get_current_round(env: Env) -> Result<(u32, u32), BracketError> {
        let competition = storage::competition(&env)?;
        Ok((
            ledger::round_start_index(competition.team_count, competition.rounds_remaining),
            ledger::match_count(competition.rounds_remaining),
        ))
    }

    pub fn get_team_names(env: Env) -> Result<Vec<String>, BracketError> {
        storage::competition(&env)?;
        storage::get_persistent(&env, &DataKey::TeamNames).ok_or(BracketError::StorageCorrupted)
    }

    pub fn is_registered(env: Env, participant: Address) -> bool {
        predictions::is_registered(&env, &participant)
    }

    pub fn get_participant_count(env: Env) -> u32 {
        predictions::registered_count(&env)
    }

    /// Raw bracket of a participant, if any.
    pub fn get_predictions(env: Env, participant: Address) -> Option<Vec<u32>> {
        predictions::registration(&env, &participant).map(|registration| registration.predictions)
    }

    /// Full participant record: bracket, stake and claim flag.
    pub fn get_registration(env: Env, participant: Address) -> Option<Registration> {
        predictions::registration(&env, &participant)
    }

    /// Participants predicting `team` to win `slot`.
    ///
    /// # Returns
    /// (member count, summed multiplier excess scaled by 10^7)
    pub fn get_bucket(env: Env, slot: u32, team: u32) -> Result<(u32, i128), BracketError> {
        let competition = storage::competition(&env)?;
        let (members, excess) = predictions::bucket(&env, competition.team_count, slot, team);
        Ok((members, excess.raw()))
    }

    /// Points awarded across all participants so far.
    pub fn get_total_score(env: Env) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        Ok(scoring::total(&env, &competition)?.points)
    }

    /// Bracket points earned by a participant so far.
    pub fn get_user_bracket_score(env: Env, participant: Address) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        Ok(scoring::participant(&env, &competition, &participant)?.points)
    }

    /// Participant's weighted share of all points, in parts-per-million.
    pub fn get_user_score_percent(env: Env, participant: Address) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        scoring::score_percent(&env, &competition, &participant)
    }

    /// Points of the participants registered at positions
    /// `[start, start + limit)` that have at least one correct scored pick.
    /// Pages hold at most 16 participants.
    pub fn get_scoreboard(
        env: Env,
        start: u32,
        limit: u32,
    ) -> Result<Map<Address, i128>, BracketError> {
        let competition = storage::competition(&env)?;
        scoring::scoreboard(&env, &competition, start, limit)
    }

    pub fn get_pending_rewards(env: Env, participant: Address) -> Result<i128, BracketError> {
        let competition = storage::competition(&env)?;
        settlement::pending_rewards(&env, &competition, &participant)
    }

    pub fn get_pending_protocol_fees(env: Env) -> Result<i128, BracketError> {
        storage::competition(&env)?;
        settlement::protocol_fees(&env)
    }

    /// Entry fee config, `None` for unpaid competitions.
    pub fn get_fee(env: Env) -> Option<FeeParams> {
        storage::fee(&env)
    }

    /// Payment multiplier scaled by 10^7; 0 when the participant never paid.
    pub fn get_multiplier(env: Env, participant: Address) -> i128 {
        match predictions::registration(&env, &participant) {
            Some(registration) if registration.deposit > 0 => registration.multiplier,
            _ => 0,
        }
    }

    pub fn get_total_reserves(env: Env) -> i128 {
        settlement::total_reserves(&env)
    }

    /// Gross pool the rewards and protocol fee are computed from.
    pub fn get_prize_pool(env: Env) -> Result<i128, BracketError> {
        settlement::prize_pool(&env)
    }

    pub fn has_claimed(env: Env, participant: Address) -> bool {
        predictions::registration(&env, &participant)
            .map(|registration| registration.claimed)
            .unwrap_or(false)
    }

    // --- Internal helpers ---

    fn finish_round(env: &Env, competition: &mut Competition) -> Result<(), BracketError> {
        lifecycle::advance(competition)?;
        storage::set_competition(env, competition);
        storage::bump_instance(env);

        log!(env, "round advanced", competition.rounds_remaining);
        events::round_advanced(env, competition.rounds_remaining, competition.finished);
        Ok(())
    }
}
