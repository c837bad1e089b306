use std::{
    collections::BTreeMap,
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    path::{Path, PathBuf},
};

use clap::Arg;
use thiserror::Error;
use tracing::debug;

use atlas_common::{
    address::{AddressError, VALOPER_HRP},
    coins::Coin,
    dec::Dec,
    transactions::{
        CommissionRates, CreateValidatorMsg, Description, Msg, TransactionError, TxBuilder,
    },
};
use atlas_wallet::KeyRecord;

use crate::identity::NodeIdentity;

pub const FLAG_AMOUNT: &str = "amount";
pub const FLAG_COMMISSION_RATE: &str = "commission-rate";
pub const FLAG_COMMISSION_MAX_RATE: &str = "commission-max-rate";
pub const FLAG_COMMISSION_MAX_CHANGE_RATE: &str = "commission-max-change-rate";
pub const FLAG_MIN_SELF_DELEGATION: &str = "min-self-delegation";
pub const FLAG_MONIKER: &str = "moniker";
pub const FLAG_IDENTITY: &str = "identity";
pub const FLAG_WEBSITE: &str = "website";
pub const FLAG_SECURITY_CONTACT: &str = "security-contact";
pub const FLAG_DETAILS: &str = "details";
pub const FLAG_IP: &str = "ip";

pub const DEFAULT_AMOUNT: &str = "100000000stake";
pub const DEFAULT_COMMISSION_RATE: &str = "0.1";
pub const DEFAULT_COMMISSION_MAX_RATE: &str = "0.2";
pub const DEFAULT_COMMISSION_MAX_CHANGE_RATE: &str = "0.01";
pub const DEFAULT_MIN_SELF_DELEGATION: &str = "1";
pub const DEFAULT_MONIKER: &str = "atlas-validator";

pub const P2P_PORT: u16 = 26656;

#[derive(Debug, Error)]
pub enum MsgBuildError {
    #[error("invalid value {value:?} for --{flag}: {reason}")]
    InvalidFlag {
        flag: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Invalid(#[from] TransactionError),
}

/// Values of the builder's own flags, keyed by flag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorFlags(BTreeMap<String, String>);

impl ValidatorFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.set(flag, value);
        self
    }

    pub fn set(&mut self, flag: &str, value: impl Into<String>) {
        self.0.insert(flag.to_string(), value.into());
    }

    /// The value of `flag`, treating an empty string as unset.
    pub fn get(&self, flag: &str) -> Option<&str> {
        self.0.get(flag).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Inputs a message builder may rely on.
///
/// Only constructible from a resolved [`NodeIdentity`], so a message can
/// never be built before identity and chain ID are known.
#[derive(Debug, Clone)]
pub struct MsgContext {
    identity: NodeIdentity,
    chain_id: String,
    home: PathBuf,
}

impl MsgContext {
    pub fn new(
        identity: NodeIdentity,
        chain_id: impl Into<String>,
        home: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identity,
            chain_id: chain_id.into(),
            home: home.into(),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// Strategy producing the create-validator message and its flags.
pub trait CreateValidatorMsgBuilder {
    /// Flags merged into the `gentx` command.
    fn flags(&self, ip_default: &str) -> Vec<Arg>;

    /// Name of the flag holding the self-delegation amount.
    fn amount_flag(&self) -> &'static str;

    /// Human readable defaults, shown in the command's long help.
    fn defaults_description(&self) -> String;

    fn build_create_validator_msg(
        &self,
        ctx: &MsgContext,
        flags: &ValidatorFlags,
        key: &KeyRecord,
        tx: TxBuilder,
    ) -> Result<(TxBuilder, Msg), MsgBuildError>;
}

/// Default builder: a self-bonded validator with staking module defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakingMsgBuilder;

impl CreateValidatorMsgBuilder for StakingMsgBuilder {
    fn flags(&self, ip_default: &str) -> Vec<Arg> {
        vec![
            Arg::new(FLAG_AMOUNT)
                .long(FLAG_AMOUNT)
                .value_name("COIN")
                .default_value(DEFAULT_AMOUNT)
                .help("Amount of coins to bond"),
            Arg::new(FLAG_COMMISSION_RATE)
                .long(FLAG_COMMISSION_RATE)
                .value_name("DEC")
                .default_value(DEFAULT_COMMISSION_RATE)
                .help("The initial commission rate percentage"),
            Arg::new(FLAG_COMMISSION_MAX_RATE)
                .long(FLAG_COMMISSION_MAX_RATE)
                .value_name("DEC")
                .default_value(DEFAULT_COMMISSION_MAX_RATE)
                .help("The maximum commission rate percentage"),
            Arg::new(FLAG_COMMISSION_MAX_CHANGE_RATE)
                .long(FLAG_COMMISSION_MAX_CHANGE_RATE)
                .value_name("DEC")
                .default_value(DEFAULT_COMMISSION_MAX_CHANGE_RATE)
                .help("The maximum commission change rate percentage (per day)"),
            Arg::new(FLAG_MIN_SELF_DELEGATION)
                .long(FLAG_MIN_SELF_DELEGATION)
                .value_name("INT")
                .default_value(DEFAULT_MIN_SELF_DELEGATION)
                .help("The minimum self delegation required on the validator"),
            Arg::new(FLAG_MONIKER)
                .long(FLAG_MONIKER)
                .value_name("NAME")
                .help("The validator's name [default: node home directory name]"),
            Arg::new(FLAG_IDENTITY)
                .long(FLAG_IDENTITY)
                .value_name("ID")
                .help("The optional identity signature (ex. UPort or Keybase)"),
            Arg::new(FLAG_WEBSITE)
                .long(FLAG_WEBSITE)
                .value_name("URL")
                .help("The validator's (optional) website"),
            Arg::new(FLAG_SECURITY_CONTACT)
                .long(FLAG_SECURITY_CONTACT)
                .value_name("EMAIL")
                .help("The validator's (optional) security contact email"),
            Arg::new(FLAG_DETAILS)
                .long(FLAG_DETAILS)
                .value_name("TEXT")
                .help("The validator's (optional) details"),
            Arg::new(FLAG_IP)
                .long(FLAG_IP)
                .value_name("IP")
                .default_value(ip_default.to_string())
                .help("The node's public IP"),
        ]
    }

    fn amount_flag(&self) -> &'static str {
        FLAG_AMOUNT
    }

    fn defaults_description(&self) -> String {
        format!(
            "delegation amount:           {}\n\
             commission rate:             {}\n\
             commission max rate:         {}\n\
             commission max change rate:  {}\n\
             minimum self delegation:     {}",
            DEFAULT_AMOUNT,
            DEFAULT_COMMISSION_RATE,
            DEFAULT_COMMISSION_MAX_RATE,
            DEFAULT_COMMISSION_MAX_CHANGE_RATE,
            DEFAULT_MIN_SELF_DELEGATION,
        )
    }

    fn build_create_validator_msg(
        &self,
        ctx: &MsgContext,
        flags: &ValidatorFlags,
        key: &KeyRecord,
        tx: TxBuilder,
    ) -> Result<(TxBuilder, Msg), MsgBuildError> {
        let amount_str = flags.get(FLAG_AMOUNT).unwrap_or(DEFAULT_AMOUNT);
        let value = Coin::parse(amount_str).map_err(|e| invalid(FLAG_AMOUNT, amount_str, e))?;

        let commission = CommissionRates {
            rate: parse_dec(flags, FLAG_COMMISSION_RATE, DEFAULT_COMMISSION_RATE)?,
            max_rate: parse_dec(flags, FLAG_COMMISSION_MAX_RATE, DEFAULT_COMMISSION_MAX_RATE)?,
            max_change_rate: parse_dec(
                flags,
                FLAG_COMMISSION_MAX_CHANGE_RATE,
                DEFAULT_COMMISSION_MAX_CHANGE_RATE,
            )?,
        };

        let min_str = flags.get(FLAG_MIN_SELF_DELEGATION).unwrap_or(DEFAULT_MIN_SELF_DELEGATION);
        let min_self_delegation = match min_str.parse::<u128>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(invalid(
                    FLAG_MIN_SELF_DELEGATION,
                    min_str,
                    "must be a positive integer",
                ));
            }
        };

        let ip = match flags.get(FLAG_IP) {
            Some(s) => s.parse::<IpAddr>().map_err(|e| invalid(FLAG_IP, s, e))?,
            None => detect_local_ip(),
        };

        let description = Description {
            moniker: flags
                .get(FLAG_MONIKER)
                .map(str::to_string)
                .unwrap_or_else(|| default_moniker(ctx.home())),
            identity: flags.get(FLAG_IDENTITY).unwrap_or_default().to_string(),
            website: flags.get(FLAG_WEBSITE).unwrap_or_default().to_string(),
            security_contact: flags.get(FLAG_SECURITY_CONTACT).unwrap_or_default().to_string(),
            details: flags.get(FLAG_DETAILS).unwrap_or_default().to_string(),
        };

        let msg = CreateValidatorMsg {
            description,
            commission,
            min_self_delegation,
            delegator_address: key.address.clone(),
            validator_address: key.address.with_hrp(VALOPER_HRP)?,
            pubkey: *ctx.identity().consensus_pubkey(),
            value,
        };
        msg.validate_basic()?;

        let memo = format!("{}@{}", ctx.identity().node_id(), SocketAddr::new(ip, P2P_PORT));
        debug!(moniker = %msg.description.moniker, %memo, "built create-validator message");

        Ok((tx.with_memo(memo), Msg::CreateValidator(msg)))
    }
}

fn invalid(flag: &'static str, value: &str, reason: impl ToString) -> MsgBuildError {
    MsgBuildError::InvalidFlag {
        flag,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_dec(
    flags: &ValidatorFlags,
    flag: &'static str,
    default: &str,
) -> Result<Dec, MsgBuildError> {
    let value = flags.get(flag).unwrap_or(default);
    value.parse::<Dec>().map_err(|e| invalid(flag, value, e))
}

/// The node home's directory name, or [`DEFAULT_MONIKER`].
pub fn default_moniker(home: &Path) -> String {
    home.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_MONIKER)
        .to_string()
}

/// The local address used for outbound traffic, falling back to loopback.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn detect_local_ip() -> IpAddr {
    let detected = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .ok()
        .map(|addr| addr.ip())
        .filter(|ip| matches!(ip, IpAddr::V4(v4) if !v4.is_unspecified()));

    detected.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
