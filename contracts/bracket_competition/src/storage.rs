use soroban_sdk::{contracttype, Address, Env, IntoVal, String, TryFromVal, Val, Vec};

use crate::error::BracketError;

/// Storage keys for the contract.
/// Config lives in instance storage, per-participant and per-round
/// entries in persistent storage.
#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Factory allowed to initialize this instance
    Factory,
    /// Competition config and lifecycle flags
    Competition,
    /// Team names, indexed by team id
    TeamNames,
    /// Outcome ledger (N - 1 slots)
    Outcomes,
    /// Fee token, amount and protocol fee rate (paid competitions only)
    Fee,
    /// Escrowed funds still held by the contract
    TotalReserves,
    /// Funds already paid out of the prize pool by claims
    Distributed,
    /// Whether the protocol fee was paid out
    ProtocolFeesClaimed,
    /// Number of registered participants
    RegisteredCount,
    /// Participant record: Registration(participant)
    Registration(Address),
    /// Participant list in registration order: Participant(index)
    Participant(u32),
    /// Reverse index of one round: RoundTally(round)
    RoundTally(u32),
}

/// Implementation kind, resolved once by the router.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum CompetitionKind {
    Base = 0,
    Predictable = 1,
    PaidPredictable = 2,
}

/// Creation parameters passed by the factory.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompetitionParams {
    pub admin: Address,
    pub kind: CompetitionKind,
    pub name: String,
    pub banner: String,
    /// Bracket size N: a power of two, at most MAX_TEAMS
    pub team_count: u32,
    pub team_names: Vec<String>,
    pub starting_time: u64,
    /// `None` means the competition never expires
    pub expiration_time: Option<u64>,
}

/// Entry fee configuration for paid competitions.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeParams {
    pub token: Address,
    pub amount: i128,
    /// Protocol fee in parts-per-million of the prize pool
    pub protocol_fee_ppm: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Competition {
    pub admin: Address,
    pub kind: CompetitionKind,
    pub name: String,
    pub banner: String,
    pub team_count: u32,
    pub total_rounds: u32,
    pub rounds_remaining: u32,
    pub starting_time: u64,
    /// Ledger timestamp of the actual start, 0 before start
    pub started_at: u64,
    /// NEVER_EXPIRES when no expiration was configured
    pub expiration_time: u64,
    pub started: bool,
    pub finished: bool,
}

/// One bracket slot.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outcome {
    pub winner: Option<u32>,
    pub completed: bool,
}

/// Everything stored for one participant.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Registration {
    /// Position in the participant list
    pub index: u32,
    /// Predicted winner (team id) of every slot
    pub predictions: Vec<u32>,
    /// Payment multiplier scaled by SCALE_FACTOR, 1.0 without payment
    pub multiplier: i128,
    /// Fee tokens escrowed for this participant
    pub deposit: i128,
    pub claimed: bool,
}

/// Reverse index of one round, indexed by team id.
///
/// A team can only reach one slot per round, so the bucket `(slot, team)`
/// is the team's entry in the tally of the slot's round. `members[t]`
/// counts participants predicting `t` there, `excess[t]` sums their
/// `multiplier - 1.0`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundTally {
    pub members: Vec<u32>,
    pub excess: Vec<i128>,
}

/// Expiration sentinel for competitions without an expiration time.
pub const NEVER_EXPIRES: u64 = u64::MAX;

/// Largest supported bracket.
pub const MAX_TEAMS: u32 = 256;

/// Points split across the matches of every round.
/// Integer division leaves up to `matches - 1` points of dust per round.
pub const POINTS_PER_ROUND: i128 = 1_000_000;

/// Scale factor for fixed-point multipliers.
/// Uses 7 decimal places to match Stellar/Soroban native token precision.
pub const SCALE_FACTOR: i128 = 10_000_000; // 10^7

/// Denominator for parts-per-million values (protocol fee, score percent).
pub const PPM_DENOMINATOR: i128 = 1_000_000;

/// Largest scoreboard page.
pub const SCOREBOARD_PAGE_LIMIT: u32 = 16;

/// TTL bump for persistent entries (~30 days at 5s ledgers).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;
/// Persistent entries are bumped once their TTL falls below this.
pub const PERSISTENT_THRESHOLD_LEDGERS: u32 = PERSISTENT_BUMP_LEDGERS - 17_280;

// --- Typed accessors ---

pub fn competition(env: &Env) -> Result<Competition, BracketError> {
    env.storage()
        .instance()
        .get(&DataKey::Competition)
        .ok_or(BracketError::NotInitialized)
}

pub fn set_competition(env: &Env, competition: &Competition) {
    env.storage()
        .instance()
        .set(&DataKey::Competition, competition);
}

pub fn fee(env: &Env) -> Option<FeeParams> {
    env.storage().instance().get(&DataKey::Fee)
}

pub fn instance_i128(env: &Env, key: &DataKey) -> i128 {
    env.storage().instance().get(key).unwrap_or(0)
}

pub fn set_instance_i128(env: &Env, key: &DataKey, value: i128) {
    env.storage().instance().set(key, &value);
}

pub fn get_persistent<V>(env: &Env, key: &DataKey) -> Option<V>
where
    V: TryFromVal<Env, Val>,
{
    env.storage().persistent().get(key)
}

pub fn set_persistent<V>(env: &Env, key: &DataKey, value: &V)
where
    V: IntoVal<Env, Val>,
{
    env.storage().persistent().set(key, value);
    env.storage().persistent().extend_ttl(
        key,
        PERSISTENT_THRESHOLD_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

pub fn remove_persistent(env: &Env, key: &DataKey) {
    env.storage().persistent().remove(key);
}

pub fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(PERSISTENT_THRESHOLD_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}
