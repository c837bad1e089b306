//! Genesis state checks: per-module validation and account funding.

use std::{collections::BTreeSet, ops::ControlFlow};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;
use tracing::debug;

use atlas_common::{
    address::{Address, ACCOUNT_HRP},
    coins::{validate_denom, Coins},
    genesis::AppState,
    transactions::{JsonTxCodec, Msg, TxDecoder},
};

use crate::error::ErrorKind;

pub const ACCOUNTS_MODULE: &str = "accounts";
pub const STAKING_MODULE: &str = "staking";
pub const GENUTIL_MODULE: &str = "genutil";

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("genesis state has no entry for module {0}")]
    MissingModule(String),

    #[error("invalid {module} genesis state: {reason}")]
    InvalidModule { module: String, reason: String },

    #[error("account {0} does not exist in genesis state")]
    AccountNotFound(Address),

    #[error(
        "account {address} has a balance in genesis, but it only has {available}{denom} available to stake, not {required}{denom}"
    )]
    InsufficientFunds {
        address: Address,
        denom: String,
        available: u128,
        required: u128,
    },
}

impl GenesisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenesisError::AccountNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }

    fn invalid(module: &str, reason: impl ToString) -> Self {
        GenesisError::InvalidModule { module: module.to_string(), reason: reason.to_string() }
    }
}

/// A module's stateless genesis checks.
pub trait AppModuleBasic {
    fn name(&self) -> &'static str;
    fn validate_genesis(&self, state: &RawValue) -> Result<(), GenesisError>;
}

/// The registered modules, validated in registration order.
pub struct BasicManager {
    modules: Vec<Box<dyn AppModuleBasic>>,
}

impl BasicManager {
    pub fn new(modules: Vec<Box<dyn AppModuleBasic>>) -> Self {
        Self { modules }
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Runs every module's check and stops at the first failure.
    pub fn validate_genesis(&self, app_state: &AppState) -> Result<(), GenesisError> {
        for module in &self.modules {
            let state = app_state
                .get(module.name())
                .ok_or_else(|| GenesisError::MissingModule(module.name().to_string()))?;
            module.validate_genesis(state)?;
            debug!(module = module.name(), "genesis state valid");
        }
        Ok(())
    }
}

impl Default for BasicManager {
    fn default() -> Self {
        Self::new(vec![Box::new(AccountsModule), Box::new(StakingModule), Box::new(GenutilModule)])
    }
}

fn parse_state<T: DeserializeOwned>(module: &str, state: &RawValue) -> Result<T, GenesisError> {
    serde_json::from_str(state.get()).map_err(|e| GenesisError::invalid(module, e))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    #[serde(default)]
    pub coins: Coins,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AccountsGenesis {
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
}

/// Walks the accounts present in genesis.
pub trait GenesisAccountsIterator {
    fn for_each_account(
        &self,
        app_state: &AppState,
        f: &mut dyn FnMut(&GenesisAccount) -> ControlFlow<()>,
    ) -> Result<(), GenesisError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountsModule;

impl AppModuleBasic for AccountsModule {
    fn name(&self) -> &'static str {
        ACCOUNTS_MODULE
    }

    fn validate_genesis(&self, state: &RawValue) -> Result<(), GenesisError> {
        let genesis: AccountsGenesis = parse_state(ACCOUNTS_MODULE, state)?;
        let mut seen = BTreeSet::new();

        for account in &genesis.accounts {
            let invalid = |e: &dyn std::fmt::Display| {
                GenesisError::invalid(ACCOUNTS_MODULE, format!("{}: {}", account.address, e))
            };
            Address::parse(&account.address, ACCOUNT_HRP).map_err(|e| invalid(&e))?;
            if !seen.insert(&account.address) {
                return Err(GenesisError::invalid(
                    ACCOUNTS_MODULE,
                    format!("duplicate account {}", account.address),
                ));
            }
            account.coins.validate().map_err(|e| invalid(&e))?;
        }
        Ok(())
    }
}

impl GenesisAccountsIterator for AccountsModule {
    fn for_each_account(
        &self,
        app_state: &AppState,
        f: &mut dyn FnMut(&GenesisAccount) -> ControlFlow<()>,
    ) -> Result<(), GenesisError> {
        let genesis: AccountsGenesis = match app_state.get(ACCOUNTS_MODULE) {
            Some(state) => parse_state(ACCOUNTS_MODULE, state)?,
            None => return Ok(()),
        };
        for account in &genesis.accounts {
            if f(account).is_break() {
                break;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StakingParams {
    pub bond_denom: String,
    pub max_validators: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StakingGenesis {
    pub params: StakingParams,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StakingModule;

impl AppModuleBasic for StakingModule {
    fn name(&self) -> &'static str {
        STAKING_MODULE
    }

    fn validate_genesis(&self, state: &RawValue) -> Result<(), GenesisError> {
        let genesis: StakingGenesis = parse_state(STAKING_MODULE, state)?;
        validate_denom(&genesis.params.bond_denom)
            .map_err(|e| GenesisError::invalid(STAKING_MODULE, e))?;
        if genesis.params.max_validators == 0 {
            return Err(GenesisError::invalid(STAKING_MODULE, "max_validators must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenutilGenesis {
    #[serde(default)]
    pub gen_txs: Vec<Box<RawValue>>,
}

/// Checks transactions already collected into genesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenutilModule;

impl AppModuleBasic for GenutilModule {
    fn name(&self) -> &'static str {
        GENUTIL_MODULE
    }

    fn validate_genesis(&self, state: &RawValue) -> Result<(), GenesisError> {
        let genesis: GenutilGenesis = parse_state(GENUTIL_MODULE, state)?;
        for (i, raw) in genesis.gen_txs.iter().enumerate() {
            let tx = JsonTxCodec
                .decode(raw.get().as_bytes())
                .map_err(|e| {
                    GenesisError::invalid(GENUTIL_MODULE, format!("gen_txs[{}]: {}", i, e))
                })?;
            match tx.msg.as_slice() {
                [Msg::CreateValidator(_)] => {}
                msgs => {
                    return Err(GenesisError::invalid(
                        GENUTIL_MODULE,
                        format!(
                            "gen_txs[{}] must hold one create-validator message, found {}",
                            i,
                            msgs.len()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Checks that `address` exists in genesis and holds at least `required`
/// of every listed denom.
pub fn validate_account_in_genesis(
    app_state: &AppState,
    accounts: &dyn GenesisAccountsIterator,
    address: &Address,
    required: &Coins,
) -> Result<(), GenesisError> {
    let mut found = None;
    accounts.for_each_account(app_state, &mut |account| {
        if &account.address == address {
            found = Some(account.coins.clone());
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;

    let coins = found.ok_or_else(|| GenesisError::AccountNotFound(address.clone()))?;

    for coin in required.iter() {
        let available = coins.amount_of(&coin.denom);
        if available < coin.amount {
            return Err(GenesisError::InsufficientFunds {
                address: address.clone(),
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::genesis::GenesisDocument;
    use ed25519_dalek::SigningKey;

    fn account(seed: u8) -> Address {
        let pk = SigningKey::from_bytes(&[seed; 32]).verifying_key();
        Address::address_from_pk(&pk, ACCOUNT_HRP).unwrap()
    }

    fn app_state(accounts: &str, staking: &str, genutil: &str) -> AppState {
        let json = format!(
            r#"{{"chain_id":"atlas-test","app_state":{{"accounts":{},"staking":{},"genutil":{}}}}}"#,
            accounts, staking, genutil
        );
        GenesisDocument::from_json(&json).unwrap().app_state().unwrap()
    }

    fn funded(address: &Address, coins: &str) -> String {
        format!(r#"{{"accounts":[{{"address":"{}","coins":{}}}]}}"#, address, coins)
    }

    const STAKING: &str = r#"{"params":{"bond_denom":"stake","max_validators":100}}"#;
    const GENUTIL: &str = r#"{"gen_txs":[]}"#;

    #[test]
    fn test_default_modules_accept_valid_state() {
        let addr = account(1);
        let accounts = funded(&addr, r#"[{"denom":"stake","amount":"10"}]"#);
        let state = app_state(&accounts, STAKING, GENUTIL);
        assert!(BasicManager::default().validate_genesis(&state).is_ok());
        assert_eq!(BasicManager::default().module_names(), vec!["accounts", "staking", "genutil"]);
    }

    #[test]
    fn test_missing_module_is_an_error() {
        let json = r#"{"chain_id":"atlas-test","app_state":{"accounts":{"accounts":[]}}}"#;
        let state = GenesisDocument::from_json(json).unwrap().app_state().unwrap();

        let err = BasicManager::default().validate_genesis(&state).unwrap_err();
        assert!(matches!(err, GenesisError::MissingModule(ref m) if m == "staking"));
    }

    #[test]
    fn test_first_failing_module_wins() {
        let state = app_state(
            r#"{"accounts":[{"address":"bogus","coins":[]}]}"#,
            r#"{"params":{"bond_denom":"stake","max_validators":0}}"#,
            GENUTIL,
        );
        let err = BasicManager::default().validate_genesis(&state).unwrap_err();
        assert!(matches!(
            err,
            GenesisError::InvalidModule { ref module, .. } if module == "accounts"
        ));
    }

    #[test]
    fn test_accounts_rejects_duplicates_and_foreign_prefix() {
        let addr = account(1);
        let dup = format!(
            r#"{{"accounts":[{{"address":"{0}","coins":[]}},{{"address":"{0}","coins":[]}}]}}"#,
            addr
        );
        let state = app_state(&dup, STAKING, GENUTIL);
        assert!(BasicManager::default().validate_genesis(&state).is_err());

        let valoper = addr.with_hrp("nbvaloper").unwrap();
        let state = app_state(&funded(&valoper, "[]"), STAKING, GENUTIL);
        assert!(BasicManager::default().validate_genesis(&state).is_err());
    }

    #[test]
    fn test_staking_rejects_bad_params() {
        let state = app_state(
            r#"{"accounts":[]}"#,
            r#"{"params":{"bond_denom":"S","max_validators":1}}"#,
            GENUTIL,
        );
        assert!(BasicManager::default().validate_genesis(&state).is_err());
    }

    #[test]
    fn test_genutil_rejects_undecodable_tx() {
        let state = app_state(r#"{"accounts":[]}"#, STAKING, r#"{"gen_txs":[{"msg":[]}]}"#);
        let err = BasicManager::default().validate_genesis(&state).unwrap_err();
        assert!(matches!(
            err,
            GenesisError::InvalidModule { ref module, .. } if module == "genutil"
        ));
    }

    #[test]
    fn test_genutil_rejects_tx_without_message() {
        let state = app_state(
            r#"{"accounts":[]}"#,
            STAKING,
            r#"{"gen_txs":[{"msg":[],"fee":{"amount":[],"gas":200000},"signatures":[],"memo":""}]}"#,
        );
        assert!(BasicManager::default().validate_genesis(&state).is_err());
    }

    #[test]
    fn test_account_not_found_vs_insufficient_funds() {
        let addr = account(1);
        let accounts = funded(&addr, r#"[{"denom":"stake","amount":"50"}]"#);
        let state = app_state(&accounts, STAKING, GENUTIL);
        let required = Coins::parse("100stake").unwrap();

        let stranger = account(2);
        let missing =
            validate_account_in_genesis(&state, &AccountsModule, &stranger, &required).unwrap_err();
        assert!(matches!(missing, GenesisError::AccountNotFound(_)));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let short =
            validate_account_in_genesis(&state, &AccountsModule, &addr, &required).unwrap_err();
        match &short {
            GenesisError::InsufficientFunds { denom, available, required, .. } => {
                assert_eq!(denom, "stake");
                assert_eq!(*available, 50);
                assert_eq!(*required, 100);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(short.kind(), ErrorKind::Validation);
        assert_ne!(missing.to_string(), short.to_string());
    }

    #[test]
    fn test_every_required_denom_is_checked() {
        let addr = account(1);
        let accounts = funded(&addr, r#"[{"denom":"stake","amount":"500"}]"#);
        let state = app_state(&accounts, STAKING, GENUTIL);
        let check = |required: &str| {
            let required = Coins::parse(required).unwrap();
            validate_account_in_genesis(&state, &AccountsModule, &addr, &required)
        };

        assert!(check("100stake").is_ok());
        assert!(check("").is_ok());

        let err = check("1atom,100stake").unwrap_err();
        assert!(matches!(
            err,
            GenesisError::InsufficientFunds { ref denom, available: 0, .. } if denom == "atom"
        ));
    }
}
