#![no_std]

use soroban_sdk::{
    contract, contractclient, contracterror, contractimpl, contracttype, log, symbol_short,
    Address, BytesN, Env, String, Vec,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FactoryError {
    /// Factory already initialized
    AlreadyInitialized = 1,
    /// Factory not initialized
    NotInitialized = 2,
    /// Only the owner can perform this action
    Unauthorized = 3,
    /// Competition instance was not created for this factory
    DeploymentFailed = 4,
    /// No competition registered under (admin, id)
    CompetitionNotFound = 5,
    /// Base competitions take no predictions
    PredictionsNotSupported = 6,
    /// Protocol fee above 100%
    InvalidProtocolFee = 7,
}

#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    /// Owner address (configures the factory, attaches instances)
    Owner,
    /// WASM hash of the bracket_competition contract
    CompetitionWasmHash,
    /// Fee token for paid competitions
    DefaultFeeToken,
    /// Protocol fee applied to new paid competitions, in ppm
    ProtocolFeePpm,
    /// Registry entry: Competition(admin, id)
    Competition(Address, u64),
    /// Competitions created by an admin: CompetitionCount(admin)
    CompetitionCount(Address),
}

// Mirrors of the competition's argument types. Field names and order must
// match bracket_competition so values convert across the contract boundary.

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum CompetitionKind {
    Base = 0,
    Predictable = 1,
    PaidPredictable = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompetitionParams {
    pub admin: Address,
    pub kind: CompetitionKind,
    pub name: String,
    pub banner: String,
    pub team_count: u32,
    pub team_names: Vec<String>,
    pub starting_time: u64,
    pub expiration_time: Option<u64>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeParams {
    pub token: Address,
    pub amount: i128,
    pub protocol_fee_ppm: u32,
}

/// Registry entry. The kind is fixed at creation, so routing never has to
/// query the instance to pick an implementation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompetitionRecord {
    pub kind: CompetitionKind,
    pub address: Address,
}

#[allow(dead_code)]
#[contractclient(name = "BracketClient")]
pub trait BracketInterface {
    fn initialize(env: Env, params: CompetitionParams, fee: Option<FeeParams>);
    fn submit_predictions(env: Env, participant: Address, predictions: Vec<u32>, payment: i128);
    fn get_team_names(env: Env) -> Vec<String>;
    fn get_factory(env: Env) -> Address;
}

const MAX_PROTOCOL_FEE_PPM: u32 = 1_000_000;
const REGISTRY_BUMP_LEDGERS: u32 = 518_400;
const REGISTRY_THRESHOLD_LEDGERS: u32 = REGISTRY_BUMP_LEDGERS - 17_280;

/// Bracket Factory Contract
///
/// Deploys bracket competitions, keeps a per-admin registry of them and
/// routes participant calls to the right instance by (admin, id).
#[contract]
pub struct BracketFactory;

#[contractimpl]
impl BracketFactory {
    /// Initialize the factory.
    ///
    /// # Arguments
    /// * `owner` - Address that configures the factory
    /// * `competition_wasm_hash` - WASM hash of the bracket_competition contract
    /// * `default_fee_token` - Fee token for paid competitions
    /// * `protocol_fee_ppm` - Protocol fee for paid competitions (10^6 = 100%)
    pub fn initialize(
        env: Env,
        owner: Address,
        competition_wasm_hash: BytesN<32>,
        default_fee_token: Address,
        protocol_fee_ppm: u32,
    ) -> Result<(), FactoryError> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(FactoryError::AlreadyInitialized);
        }
        if protocol_fee_ppm > MAX_PROTOCOL_FEE_PPM {
            return Err(FactoryError::InvalidProtocolFee);
        }

        owner.require_auth();

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage()
            .instance()
            .set(&DataKey::CompetitionWasmHash, &competition_wasm_hash);
        env.storage()
            .instance()
            .set(&DataKey::DefaultFeeToken, &default_fee_token);
        env.storage()
            .instance()
            .set(&DataKey::ProtocolFeePpm, &protocol_fee_ppm);

        Ok(())
    }

    /// Deploy and initialize a new competition for `params.admin`.
    ///
    /// # Arguments
    /// * `params` - Competition parameters; the admin must authorize
    /// * `entry_fee` - Entry fee in the default fee token (paid kinds only)
    /// * `salt` - Unique salt for deterministic address generation
    ///
    /// # Returns
    /// Id of the competition in the admin's registry
    pub fn deploy_competition(
        env: Env,
        params: CompetitionParams,
        entry_fee: Option<i128>,
        salt: BytesN<32>,
    ) -> Result<u64, FactoryError> {
        Self::require_initialized(&env)?;

        params.admin.require_auth();

        let wasm_hash: BytesN<32> = env
            .storage()
            .instance()
            .get(&DataKey::CompetitionWasmHash)
            .ok_or(FactoryError::NotInitialized)?;

        let address = env
            .deployer()
            .with_current_contract(salt)
            .deploy_v2(wasm_hash, (env.current_contract_address(),));

        Self::register(&env, address, params, entry_fee)
    }

    /// Initialize and register an instance deployed outside the factory
    /// (owner only). The instance must have been constructed with this
    /// factory's address.
    pub fn attach_competition(
        env: Env,
        owner: Address,
        address: Address,
        params: CompetitionParams,
        entry_fee: Option<i128>,
    ) -> Result<u64, FactoryError> {
        Self::require_initialized(&env)?;
        Self::require_owner(&env, &owner)?;

        owner.require_auth();

        if BracketClient::new(&env, &address).get_factory() != env.current_contract_address() {
            return Err(FactoryError::DeploymentFailed);
        }

        Self::register(&env, address, params, entry_fee)
    }

    /// Look up a competition by (admin, id).
    pub fn resolve(env: Env, admin: Address, id: u64) -> Result<CompetitionRecord, FactoryError> {
        let key = DataKey::Competition(admin, id);
        let record: CompetitionRecord = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(FactoryError::CompetitionNotFound)?;
        env.storage().persistent().extend_ttl(
            &key,
            REGISTRY_THRESHOLD_LEDGERS,
            REGISTRY_BUMP_LEDGERS,
        );
        Ok(record)
    }

    /// All competitions of an admin, in creation order.
    pub fn list_competitions(env: Env, admin: Address) -> Vec<CompetitionRecord> {
        let mut records = Vec::new(&env);
        for id in 0..Self::competition_count(env.clone(), admin.clone()) {
            if let Some(record) = env
                .storage()
                .persistent()
                .get(&DataKey::Competition(admin.clone(), id))
            {
                records.push_back(record);
            }
        }
        records
    }

    pub fn competition_count(env: Env, admin: Address) -> u64 {
        env.storage()
            .persistent()
            .get(&DataKey::CompetitionCount(admin))
            .unwrap_or(0)
    }

    // --- Router ---

    /// Forward a bracket submission to the competition (admin, id).
    pub fn submit_predictions(
        env: Env,
        admin: Address,
        id: u64,
        participant: Address,
        predictions: Vec<u32>,
        payment: i128,
    ) -> Result<(), FactoryError> {
        let record = Self::resolve(env.clone(), admin, id)?;
        if record.kind == CompetitionKind::Base {
            return Err(FactoryError::PredictionsNotSupported);
        }

        participant.require_auth();

        BracketClient::new(&env, &record.address).submit_predictions(
            &participant,
            &predictions,
            &payment,
        );
        Ok(())
    }

    pub fn get_team_names(env: Env, admin: Address, id: u64) -> Result<Vec<String>, FactoryError> {
        let record = Self::resolve(env.clone(), admin, id)?;
        Ok(BracketClient::new(&env, &record.address).get_team_names())
    }

    // --- Configuration ---

    pub fn get_owner(env: Env) -> Result<Address, FactoryError> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(FactoryError::NotInitialized)
    }

    pub fn get_competition_wasm_hash(env: Env) -> Result<BytesN<32>, FactoryError> {
        env.storage()
            .instance()
            .get(&DataKey::CompetitionWasmHash)
            .ok_or(FactoryError::NotInitialized)
    }

    pub fn get_default_fee_token(env: Env) -> Result<Address, FactoryError> {
        env.storage()
            .instance()
            .get(&DataKey::DefaultFeeToken)
            .ok_or(FactoryError::NotInitialized)
    }

    pub fn get_protocol_fee(env: Env) -> Result<u32, FactoryError> {
        env.storage()
            .instance()
            .get(&DataKey::ProtocolFeePpm)
            .ok_or(FactoryError::NotInitialized)
    }

    /// Update the competition WASM hash (owner only).
    pub fn set_competition_wasm_hash(
        env: Env,
        owner: Address,
        new_wasm_hash: BytesN<32>,
    ) -> Result<(), FactoryError> {
        Self::require_initialized(&env)?;
        Self::require_owner(&env, &owner)?;

        owner.require_auth();

        env.storage()
            .instance()
            .set(&DataKey::CompetitionWasmHash, &new_wasm_hash);

        Ok(())
    }

    /// Update the fee token used by new paid competitions (owner only).
    pub fn set_default_fee_token(
        env: Env,
        owner: Address,
        new_token: Address,
    ) -> Result<(), FactoryError> {
        Self::require_initialized(&env)?;
        Self::require_owner(&env, &owner)?;

        owner.require_auth();

        env.storage()
            .instance()
            .set(&DataKey::DefaultFeeToken, &new_token);

        Ok(())
    }

    /// Update the protocol fee of new paid competitions (owner only).
    pub fn set_protocol_fee(
        env: Env,
        owner: Address,
        protocol_fee_ppm: u32,
    ) -> Result<(), FactoryError> {
        Self::require_initialized(&env)?;
        Self::require_owner(&env, &owner)?;
        if protocol_fee_ppm > MAX_PROTOCOL_FEE_PPM {
            return Err(FactoryError::InvalidProtocolFee);
        }

        owner.require_auth();

        env.storage()
            .instance()
            .set(&DataKey::ProtocolFeePpm, &protocol_fee_ppm);

        Ok(())
    }

    // --- Internal helpers ---

    fn require_initialized(env: &Env) -> Result<(), FactoryError> {
        if !env.storage().instance().has(&DataKey::Owner) {
            return Err(FactoryError::NotInitialized);
        }
        Ok(())
    }

    fn require_owner(env: &Env, caller: &Address) -> Result<(), FactoryError> {
        let owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(FactoryError::NotInitialized)?;
        if *caller != owner {
            return Err(FactoryError::Unauthorized);
        }
        Ok(())
    }

    /// Initialize the instance and store it under the admin's next id.
    fn register(
        env: &Env,
        address: Address,
        params: CompetitionParams,
        entry_fee: Option<i128>,
    ) -> Result<u64, FactoryError> {
        let fee = match entry_fee {
            Some(amount) => Some(FeeParams {
                token: Self::get_default_fee_token(env.clone())?,
                amount,
                protocol_fee_ppm: Self::get_protocol_fee(env.clone())?,
            }),
            None => None,
        };

        BracketClient::new(env, &address).initialize(&params, &fee);

        let admin = params.admin;
        let id = Self::competition_count(env.clone(), admin.clone());
        let record = CompetitionRecord {
            kind: params.kind,
            address: address.clone(),
        };

        let record_key = DataKey::Competition(admin.clone(), id);
        let count_key = DataKey::CompetitionCount(admin.clone());
        env.storage().persistent().set(&record_key, &record);
        env.storage().persistent().set(&count_key, &(id + 1));
        for key in [record_key, count_key] {
            env.storage().persistent().extend_ttl(
                &key,
                REGISTRY_THRESHOLD_LEDGERS,
                REGISTRY_BUMP_LEDGERS,
            );
        }

        log!(env, "competition registered", admin.clone(), id);
        env.events()
            .publish((symbol_short!("created"), admin), (id, address));
        Ok(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bracket_competition::{BracketCompetition, BracketCompetitionClient};
    use soroban_sdk::{testutils::Address as _, token::StellarAssetClient, vec, Env};

    const START: u64 = 1_000;
    const EXPIRES: u64 = 100_000;
    const FEE: i128 = 100_000_000;

    fn params(env: &Env, admin: &Address, kind: CompetitionKind) -> CompetitionParams {
        CompetitionParams {
            admin: admin.clone(),
            kind,
            name: String::from_str(env, "Spring Cup"),
            banner: String::from_str(env, "ipfs://QmBanner"),
            team_count: 2,
            team_names: vec![
                env,
                String::from_str(env, "Lions"),
                String::from_str(env, "Tigers"),
            ],
            starting_time: START,
            expiration_time: Some(EXPIRES),
        }
    }

    /// Returns (env, factory_id, owner, fee_token)
    fn setup() -> (Env, Address, Address, Address) {
        let env = Env::default();
        env.mock_all_auths();

        let factory_id = env.register(BracketFactory, ());
        let client = BracketFactoryClient::new(&env, &factory_id);

        let owner = Address::generate(&env);
        let token_admin = Address::generate(&env);
        let fee_token = env
            .register_stellar_asset_contract_v2(token_admin)
            .address();

        client.initialize(
            &owner,
            &BytesN::from_array(&env, &[0u8; 32]),
            &fee_token,
            &50_000,
        );

        (env, factory_id, owner, fee_token)
    }

    /// Register a competition instance bound to the factory.
    fn instance(env: &Env, factory_id: &Address) -> Address {
        env.register(BracketCompetition, (factory_id.clone(),))
    }

    #[test]
    fn test_initialize() {
        let (env, factory_id, owner, fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        assert_eq!(client.get_owner(), owner);
        assert_eq!(
            client.get_competition_wasm_hash(),
            BytesN::from_array(&env, &[0u8; 32])
        );
        assert_eq!(client.get_default_fee_token(), fee_token);
        assert_eq!(client.get_protocol_fee(), 50_000);
        assert_eq!(client.competition_count(&owner), 0);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #1)")] // AlreadyInitialized = 1
    fn test_double_initialize() {
        let (env, factory_id, owner, fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        client.initialize(
            &owner,
            &BytesN::from_array(&env, &[0u8; 32]),
            &fee_token,
            &0,
        );
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #7)")] // InvalidProtocolFee = 7
    fn test_initialize_protocol_fee_above_full_pool() {
        let env = Env::default();
        env.mock_all_auths();

        let factory_id = env.register(BracketFactory, ());
        let client = BracketFactoryClient::new(&env, &factory_id);

        client.initialize(
            &Address::generate(&env),
            &BytesN::from_array(&env, &[0u8; 32]),
            &Address::generate(&env),
            &1_000_001,
        );
    }

    #[test]
    fn test_attach_and_resolve() {
        let (env, factory_id, owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let admin = Address::generate(&env);
        let address = instance(&env, &factory_id);
        let id = client.attach_competition(
            &owner,
            &address,
            &params(&env, &admin, CompetitionKind::Predictable),
            &None,
        );
        assert_eq!(id, 0);

        let record = client.resolve(&admin, &0);
        assert_eq!(record.kind, CompetitionKind::Predictable);
        assert_eq!(record.address, address);
        assert_eq!(client.competition_count(&admin), 1);
        assert_eq!(client.list_competitions(&admin), vec![&env, record]);

        let competition = BracketCompetitionClient::new(&env, &address).get_competition();
        assert_eq!(competition.admin, admin);
        assert_eq!(competition.team_count, 2);
        assert_eq!(client.get_team_names(&admin, &0).len(), 2);
    }

    #[test]
    fn test_ids_are_sequential_per_admin() {
        let (env, factory_id, owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let alice = Address::generate(&env);
        let bob = Address::generate(&env);
        let kind = CompetitionKind::Base;

        let first = instance(&env, &factory_id);
        let second = instance(&env, &factory_id);
        let third = instance(&env, &factory_id);
        let alice_params = params(&env, &alice, kind);
        let bob_params = params(&env, &bob, kind);
        assert_eq!(client.attach_competition(&owner, &first, &alice_params, &None), 0);
        assert_eq!(client.attach_competition(&owner, &second, &bob_params, &None), 0);
        assert_eq!(client.attach_competition(&owner, &third, &alice_params, &None), 1);

        assert_eq!(client.resolve(&alice, &1).address, third);
        assert_eq!(client.resolve(&bob, &0).address, second);
        assert_eq!(client.list_competitions(&alice).len(), 2);
    }

    #[test]
    fn test_paid_competition_uses_factory_fee_config() {
        let (env, factory_id, owner, fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let admin = Address::generate(&env);
        let address = instance(&env, &factory_id);
        client.attach_competition(
            &owner,
            &address,
            &params(&env, &admin, CompetitionKind::PaidPredictable),
            &Some(FEE),
        );

        let fee = BracketCompetitionClient::new(&env, &address)
            .get_fee()
            .unwrap();
        assert_eq!(fee.token, fee_token);
        assert_eq!(fee.amount, FEE);
        assert_eq!(fee.protocol_fee_ppm, 50_000);
    }

    #[test]
    fn test_route_paid_submission() {
        let (env, factory_id, owner, fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let admin = Address::generate(&env);
        let address = instance(&env, &factory_id);
        client.attach_competition(
            &owner,
            &address,
            &params(&env, &admin, CompetitionKind::PaidPredictable),
            &Some(FEE),
        );

        let participant = Address::generate(&env);
        StellarAssetClient::new(&env, &fee_token).mint(&participant, &(2 * FEE));
        client.submit_predictions(&admin, &0, &participant, &vec![&env, 1u32], &(2 * FEE));

        let competition = BracketCompetitionClient::new(&env, &address);
        assert!(competition.is_registered(&participant));
        assert_eq!(competition.get_predictions(&participant), Some(vec![&env, 1u32]));
        assert_eq!(competition.get_total_reserves(), 2 * FEE);
        assert_eq!(competition.get_multiplier(&participant), 20_000_000);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #6)")] // PredictionsNotSupported = 6
    fn test_route_to_base_competition_fails() {
        let (env, factory_id, owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let admin = Address::generate(&env);
        let address = instance(&env, &factory_id);
        client.attach_competition(
            &owner,
            &address,
            &params(&env, &admin, CompetitionKind::Base),
            &None,
        );

        let participant = Address::generate(&env);
        client.submit_predictions(&admin, &0, &participant, &vec![&env, 0u32], &0);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #5)")] // CompetitionNotFound = 5
    fn test_resolve_unknown_competition() {
        let (env, factory_id, _owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        client.resolve(&Address::generate(&env), &0);
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #3)")] // Unauthorized = 3
    fn test_attach_by_non_owner_fails() {
        let (env, factory_id, _owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let admin = Address::generate(&env);
        let address = instance(&env, &factory_id);
        client.attach_competition(
            &admin,
            &address,
            &params(&env, &admin, CompetitionKind::Base),
            &None,
        );
    }

    #[test]
    #[should_panic(expected = "Error(Contract, #4)")] // DeploymentFailed = 4
    fn test_attach_foreign_instance_fails() {
        let (env, factory_id, owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let admin = Address::generate(&env);
        let foreign = instance(&env, &Address::generate(&env));
        client.attach_competition(
            &owner,
            &foreign,
            &params(&env, &admin, CompetitionKind::Base),
            &None,
        );
    }

    #[test]
    fn test_owner_setters() {
        let (env, factory_id, owner, _fee_token) = setup();
        let client = BracketFactoryClient::new(&env, &factory_id);

        let new_token = Address::generate(&env);
        client.set_default_fee_token(&owner, &new_token);
        client.set_protocol_fee(&owner, &0);
        client.set_competition_wasm_hash(&owner, &BytesN::from_array(&env, &[1u8; 32]));

        assert_eq!(client.get_default_fee_token(), new_token);
        assert_eq!(client.get_protocol_fee(), 0);
        assert_eq!(
            client.get_competition_wasm_hash(),
            BytesN::from_array(&env, &[1u8; 32])
        );

        let stranger = Address::generate(&env);
        assert_eq!(
            client.try_set_protocol_fee(&stranger, &10),
            Err(Ok(FactoryError::Unauthorized))
        );
        assert_eq!(
            client.try_set_protocol_fee(&owner, &1_000_001),
            Err(Ok(FactoryError::InvalidProtocolFee))
        );
    }
}
