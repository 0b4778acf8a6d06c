//! Fee & settlement engine for paid competitions.
//!
//! `TotalReserves` tracks the escrow balance of the fee token. Deposits are
//! measured as `balance - TotalReserves` after pulling the payment, so
//! every reserve increase is backed by tokens already in the contract.
//! Payouts update every flag and counter before the token leaves escrow.
//!
//! The prize pool is `TotalReserves + Distributed`. It stops changing once
//! the competition starts, so every claim is computed against the same pool.

use soroban_sdk::{log, token, Address, Env};

use crate::error::BracketError;
use crate::events;
use crate::fixed::Fixed;
use crate::lifecycle;
use crate::predictions;
use crate::scoring;
use crate::storage::{self, Competition, DataKey, FeeParams, PPM_DENOMINATOR};

pub fn fee_config(env: &Env) -> Result<FeeParams, BracketError> {
    storage::fee(env).ok_or(BracketError::NoFeeConfigured)
}

/// Fee config of a competition that actually charges an entry fee.
fn charged_fee(env: &Env) -> Result<FeeParams, BracketError> {
    let fee = fee_config(env)?;
    if fee.amount == 0 {
        return Err(BracketError::NoFeeConfigured);
    }
    Ok(fee)
}

pub fn total_reserves(env: &Env) -> i128 {
    storage::instance_i128(env, &DataKey::TotalReserves)
}

pub fn prize_pool(env: &Env) -> Result<i128, BracketError> {
    total_reserves(env)
        .checked_add(storage::instance_i128(env, &DataKey::Distributed))
        .ok_or(BracketError::Overflow)
}

fn untracked_balance(env: &Env, fee: &FeeParams) -> Result<i128, BracketError> {
    let balance = token::Client::new(env, &fee.token).balance(&env.current_contract_address());
    balance
        .checked_sub(total_reserves(env))
        .ok_or(BracketError::Overflow)
}

/// Pull `payment` from the participant and return the new, untracked deposit.
fn collect(
    env: &Env,
    fee: &FeeParams,
    participant: &Address,
    payment: i128,
) -> Result<i128, BracketError> {
    if payment < 0 {
        return Err(BracketError::InvalidAmount);
    }
    if payment > 0 {
        // Note: token transfer panics on insufficient balance or missing auth,
        // which aborts the whole invocation.
        token::Client::new(env, &fee.token).transfer(
            participant,
            &env.current_contract_address(),
            &payment,
        );
    }
    untracked_balance(env, fee)
}

fn add_reserves(env: &Env, amount: i128) -> Result<(), BracketError> {
    let reserves = total_reserves(env)
        .checked_add(amount)
        .ok_or(BracketError::Overflow)?;
    storage::set_instance_i128(env, &DataKey::TotalReserves, reserves);
    Ok(())
}

/// Move `amount` out of reserves and into the distributed counter.
fn record_payout(env: &Env, amount: i128) -> Result<(), BracketError> {
    let reserves = total_reserves(env)
        .checked_sub(amount)
        .ok_or(BracketError::Overflow)?;
    if reserves < 0 {
        return Err(BracketError::StorageCorrupted);
    }
    let distributed = storage::instance_i128(env, &DataKey::Distributed)
        .checked_add(amount)
        .ok_or(BracketError::Overflow)?;
    storage::set_instance_i128(env, &DataKey::TotalReserves, reserves);
    storage::set_instance_i128(env, &DataKey::Distributed, distributed);
    Ok(())
}

/// Validate the registration payment and return the participant's stake
/// as `(multiplier, deposit)`.
///
/// New participants must deposit at least the fee; the multiplier is
/// `deposit / fee`. Returning participants keep their recorded stake.
pub fn accept_registration(
    env: &Env,
    participant: &Address,
    payment: i128,
) -> Result<(Fixed, i128), BracketError> {
    let fee = fee_config(env)?;
    if fee.amount == 0 {
        if payment != 0 {
            return Err(BracketError::UnexpectedDeposit);
        }
        return Ok((Fixed::ONE, 0));
    }

    if let Some(existing) = predictions::registration(env, participant) {
        // Changing a bracket is free; new funds go through increase_multiplier.
        if payment != 0 || untracked_balance(env, &fee)? != 0 {
            return Err(BracketError::UnexpectedDeposit);
        }
        return Ok((Fixed::from_raw(existing.multiplier), existing.deposit));
    }

    let deposited = collect(env, &fee, participant, payment)?;
    if deposited < fee.amount {
        return Err(BracketError::InsufficientDeposit);
    }
    let multiplier = Fixed::ratio(deposited, fee.amount)?;

    add_reserves(env, deposited)?;
    log!(env, "registration deposit", participant.clone(), deposited);
    Ok((multiplier, deposited))
}

/// Convert a new deposit into extra multiplier for a registered participant.
///
/// The multiplier is recomputed from the participant's whole deposit, so
/// topping up in parts weighs the same as paying once.
pub fn increase_multiplier(
    env: &Env,
    competition: &Competition,
    participant: &Address,
    payment: i128,
) -> Result<Fixed, BracketError> {
    lifecycle::require_created(env, competition)?;
    let fee = charged_fee(env)?;

    let mut registration = predictions::registration(env, participant)
        .filter(|registration| registration.deposit > 0)
        .ok_or(BracketError::NotRegistered)?;

    let deposited = collect(env, &fee, participant, payment)?;
    if deposited <= 0 {
        return Err(BracketError::InsufficientDeposit);
    }
    let current = Fixed::from_raw(registration.multiplier);
    registration.deposit = registration
        .deposit
        .checked_add(deposited)
        .ok_or(BracketError::Overflow)?;
    let updated = Fixed::ratio(registration.deposit, fee.amount)?;
    registration.multiplier = updated.raw();

    add_reserves(env, deposited)?;
    predictions::add_excess(
        env,
        competition.team_count,
        &registration,
        updated.checked_sub(current)?,
    )?;
    predictions::save(env, participant, &registration);

    events::multiplier_increased(env, participant, updated.raw());
    Ok(updated)
}

/// `pool * (1 - protocol fee) * score_percent`, both rates in ppm.
pub fn pending_rewards(
    env: &Env,
    competition: &Competition,
    participant: &Address,
) -> Result<i128, BracketError> {
    if !competition.finished {
        return Ok(0);
    }
    let fee = match storage::fee(env) {
        Some(fee) => fee,
        None => return Ok(0),
    };
    match predictions::registration(env, participant) {
        Some(registration) if !registration.claimed => {}
        _ => return Ok(0),
    }
    let percent = scoring::score_percent(env, competition, participant)?;
    let net_share = PPM_DENOMINATOR - fee.protocol_fee_ppm as i128;

    prize_pool(env)?
        .checked_mul(net_share)
        .ok_or(BracketError::Overflow)?
        .checked_mul(percent)
        .ok_or(BracketError::Overflow)?
        .checked_div(PPM_DENOMINATOR * PPM_DENOMINATOR)
        .ok_or(BracketError::Overflow)
}

pub fn claim_rewards(
    env: &Env,
    competition: &Competition,
    participant: &Address,
) -> Result<i128, BracketError> {
    lifecycle::require_finished(env, competition)?;
    let fee = fee_config(env)?;

    let amount = pending_rewards(env, competition, participant)?;
    if amount <= 0 {
        return Err(BracketError::NoPendingRewards);
    }
    let mut registration =
        predictions::registration(env, participant).ok_or(BracketError::NoPendingRewards)?;

    registration.claimed = true;
    predictions::save(env, participant, &registration);
    record_payout(env, amount)?;

    token::Client::new(env, &fee.token).transfer(
        &env.current_contract_address(),
        participant,
        &amount,
    );

    events::rewards_claimed(env, participant, amount);
    Ok(amount)
}

pub fn protocol_fees(env: &Env) -> Result<i128, BracketError> {
    if env
        .storage()
        .instance()
        .get(&DataKey::ProtocolFeesClaimed)
        .unwrap_or(false)
    {
        return Ok(0);
    }
    let fee = match storage::fee(env) {
        Some(fee) => fee,
        None => return Ok(0),
    };
    prize_pool(env)?
        .checked_mul(fee.protocol_fee_ppm as i128)
        .ok_or(BracketError::Overflow)?
        .checked_div(PPM_DENOMINATOR)
        .ok_or(BracketError::Overflow)
}

/// Pay the protocol fee to the administrator, once.
pub fn claim_protocol_fees(
    env: &Env,
    competition: &Competition,
) -> Result<i128, BracketError> {
    lifecycle::require_finished(env, competition)?;
    let fee = fee_config(env)?;

    let amount = protocol_fees(env)?;
    if amount <= 0 {
        return Err(BracketError::NoPendingFees);
    }

    env.storage()
        .instance()
        .set(&DataKey::ProtocolFeesClaimed, &true);
    record_payout(env, amount)?;

    token::Client::new(env, &fee.token).transfer(
        &env.current_contract_address(),
        &competition.admin,
        &amount,
    );

    events::protocol_fees_claimed(env, &competition.admin, amount);
    Ok(amount)
}

/// Return the whole deposit to a participant of an abandoned competition.
pub fn refund_registration_fee(
    env: &Env,
    competition: &Competition,
    participant: &Address,
) -> Result<i128, BracketError> {
    lifecycle::require_expired(env, competition)?;
    let fee = charged_fee(env)?;

    match predictions::registration(env, participant) {
        Some(registration) if registration.deposit > 0 => {}
        _ => return Err(BracketError::NotRegistered),
    }
    let amount = predictions::unregister(env, competition.team_count, participant)?.deposit;

    let reserves = total_reserves(env)
        .checked_sub(amount)
        .ok_or(BracketError::Overflow)?;
    if reserves < 0 {
        return Err(BracketError::StorageCorrupted);
    }
    storage::set_instance_i128(env, &DataKey::TotalReserves, reserves);

    token::Client::new(env, &fee.token).transfer(
        &env.current_contract_address(),
        participant,
        &amount,
    );

    events::refunded(env, participant, amount);
    Ok(amount)
}
