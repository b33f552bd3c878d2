//! IC agent context shared by every actor surface

use std::path::Path;

use candid::utils::ArgumentEncoder;
use candid::{CandidType, Principal};
use ic_agent::identity::{AnonymousIdentity, BasicIdentity, Secp256k1Identity};
use ic_agent::{Agent, Identity};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::ic::types::parse_principal;
use crate::storage::settings::IcSettings;

/// IC client options
#[derive(Debug, Clone)]
pub struct IcOptions {
    pub host: String,
    pub fetch_root_key: bool,
    pub status_proxy: Option<Principal>,
    pub ledger: Option<Principal>,
}

impl IcOptions {
    pub fn from_settings(settings: &IcSettings) -> Result<Self, AgentError> {
        let optional = |text: &str| -> Result<Option<Principal>, AgentError> {
            if text.trim().is_empty() {
                Ok(None)
            } else {
                parse_principal(text).map(Some)
            }
        };

        Ok(Self {
            host: settings.host.clone(),
            fetch_root_key: settings.fetch_root_key,
            status_proxy: optional(&settings.status_proxy_canister_id)?,
            ledger: optional(&settings.ledger_canister_id)?,
        })
    }
}

/// Single IC agent built at start-up and handed to consumers by `Arc`
pub struct IcClient {
    agent: Agent,
    options: IcOptions,
}

impl IcClient {
    /// Build the agent from the identity file (anonymous when absent)
    pub async fn connect(options: IcOptions, identity_file: &File) -> Result<Self, AgentError> {
        let identity = if identity_file.exists().await {
            load_identity(identity_file.path())?
        } else {
            warn!(
                "No identity at {}, using the anonymous principal",
                identity_file.path().display()
            );
            Box::new(AnonymousIdentity)
        };

        let agent = Agent::builder()
            .with_url(options.host.clone())
            .with_boxed_identity(identity)
            .build()?;

        if options.fetch_root_key {
            agent.fetch_root_key().await?;
        }

        let client = Self { agent, options };
        info!("IC agent ready for {} as {}", client.options.host, client.principal_text());
        Ok(client)
    }

    pub fn options(&self) -> &IcOptions {
        &self.options
    }

    /// Principal of the loaded identity
    pub fn principal(&self) -> Result<Principal, AgentError> {
        self.agent.get_principal().map_err(AgentError::IdentityError)
    }

    fn principal_text(&self) -> String {
        self.principal()
            .map(|p| p.to_text())
            .unwrap_or_else(|_| "<unknown>".to_string())
    }

    pub(crate) fn status_proxy_id(&self) -> Result<Principal, AgentError> {
        self.options
            .status_proxy
            .ok_or_else(|| AgentError::ConfigError("status proxy canister id is not configured".to_string()))
    }

    pub(crate) fn ledger_id(&self) -> Result<Principal, AgentError> {
        self.options
            .ledger
            .ok_or_else(|| AgentError::ConfigError("ledger canister id is not configured".to_string()))
    }

    /// Query call with a single Candid return value
    pub async fn query<A, R>(&self, canister: &Principal, method: &str, args: A) -> Result<R, AgentError>
    where
        A: ArgumentEncoder,
        R: CandidType + DeserializeOwned,
    {
        debug!("query {}.{}", canister, method);
        let bytes = self
            .agent
            .query(canister, method)
            .with_arg(candid::encode_args(args)?)
            .call()
            .await?;
        Ok(candid::decode_one(&bytes)?)
    }

    /// Update call with a single Candid return value
    pub async fn update<A, R>(&self, canister: &Principal, method: &str, args: A) -> Result<R, AgentError>
    where
        A: ArgumentEncoder,
        R: CandidType + DeserializeOwned,
    {
        let bytes = self.update_raw(canister, canister, method, args).await?;
        Ok(candid::decode_one(&bytes)?)
    }

    /// Update call whose reply is ignored
    pub async fn update_unit<A>(&self, canister: &Principal, method: &str, args: A) -> Result<(), AgentError>
    where
        A: ArgumentEncoder,
    {
        self.update_raw(canister, canister, method, args).await?;
        Ok(())
    }

    /// Update call routed through `effective_canister_id` (management canister)
    pub(crate) async fn update_raw<A>(
        &self,
        canister: &Principal,
        effective_canister_id: &Principal,
        method: &str,
        args: A,
    ) -> Result<Vec<u8>, AgentError>
    where
        A: ArgumentEncoder,
    {
        debug!("update {}.{}", canister, method);
        let bytes = self
            .agent
            .update(canister, method)
            .with_effective_canister_id(*effective_canister_id)
            .with_arg(candid::encode_args(args)?)
            .call_and_wait()
            .await?;
        Ok(bytes)
    }

    /// Release the agent
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        info!("Closing IC agent for {}", self.options.host);
        Ok(())
    }
}

fn load_identity(path: &Path) -> Result<Box<dyn Identity>, AgentError> {
    match BasicIdentity::from_pem_file(path) {
        Ok(identity) => return Ok(Box::new(identity)),
        Err(e) => debug!("{} is not an Ed25519 identity: {}", path.display(), e),
    }

    Secp256k1Identity::from_pem_file(path)
        .map(|identity| Box::new(identity) as Box<dyn Identity>)
        .map_err(|e| AgentError::IdentityError(format!("{}: {}", path.display(), e)))
}
