use soroban_sdk::{symbol_short, Address, Env};

pub fn initialized(env: &Env, admin: &Address, team_count: u32) {
    env.events()
        .publish((symbol_short!("init"), admin.clone()), team_count);
}

pub fn started(env: &Env, started_at: u64) {
    env.events().publish((symbol_short!("started"),), started_at);
}

pub fn match_completed(env: &Env, slot: u32, winner: u32) {
    env.events()
        .publish((symbol_short!("match"), slot), winner);
}

pub fn round_advanced(env: &Env, rounds_remaining: u32, finished: bool) {
    env.events()
        .publish((symbol_short!("advanced"),), (rounds_remaining, finished));
}

pub fn registered(env: &Env, participant: &Address, multiplier: i128) {
    env.events()
        .publish((symbol_short!("register"), participant.clone()), multiplier);
}

pub fn multiplier_increased(env: &Env, participant: &Address, multiplier: i128) {
    env.events()
        .publish((symbol_short!("boosted"), participant.clone()), multiplier);
}

pub fn rewards_claimed(env: &Env, participant: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("claimed"), participant.clone()), amount);
}

pub fn protocol_fees_claimed(env: &Env, admin: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("fees"), admin.clone()), amount);
}

pub fn refunded(env: &Env, participant: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("refunded"), participant.clone()), amount);
}
