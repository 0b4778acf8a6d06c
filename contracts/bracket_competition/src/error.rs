use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BracketError {
    /// Competition already initialized
    AlreadyInitialized = 1,
    /// Competition not initialized
    NotInitialized = 2,
    /// Caller is not the administrator, the factory or the owning participant
    Unauthorized = 3,
    /// Starting time must be strictly in the future
    InvalidStartTime = 4,
    /// Team count must be a power of two between 2 and 256
    InvalidTeamCount = 5,
    /// Number of team names does not match the bracket size
    TeamCountMismatch = 6,
    /// Expiration missing, zero, or not after the starting time
    InvalidExpiration = 7,
    /// Fee parameters missing, negative, or supplied for an unpaid competition
    InvalidFee = 8,
    /// Protocol fee exceeds 100% (10^6 ppm)
    InvalidProtocolFee = 9,
    /// Competition already started
    AlreadyStarted = 10,
    /// Competition is not live (not started, finished or expired)
    NotLive = 11,
    /// Competition expired without finishing
    Expired = 12,
    /// Competition has not expired yet
    NotExpired = 13,
    /// Competition already finished
    AlreadyFinished = 14,
    /// Competition not finished yet
    NotFinished = 15,
    /// Slot is outside the current round
    InvalidSlot = 16,
    /// Team cannot play or win in that slot, or result side is not 0/1
    InvalidTeam = 17,
    /// Match already completed
    AlreadyCompleted = 18,
    /// A match of the current round is not completed
    MatchNotCompleted = 19,
    /// No rounds left to advance
    NoRoundsRemaining = 20,
    /// Result count does not match the matches in the current round
    ResultCountMismatch = 21,
    /// Prediction count does not match the number of slots
    PredictionCountMismatch = 22,
    /// Competition kind does not accept predictions
    PredictionsDisabled = 23,
    /// Competition has no entry fee
    NoFeeConfigured = 24,
    /// Deposit below the entry fee, or no new deposit
    InsufficientDeposit = 25,
    /// Funds deposited where none are accepted
    UnexpectedDeposit = 26,
    /// Participant is not registered
    NotRegistered = 27,
    /// Nothing to claim, or already claimed
    NoPendingRewards = 28,
    /// Protocol fees are zero or already claimed
    NoPendingFees = 29,
    /// Arithmetic overflow
    Overflow = 30,
    /// Critical storage data missing (contract state corrupted)
    StorageCorrupted = 31,
    /// Amount must not be negative
    InvalidAmount = 32,
}
