//! Canister models

use std::fmt;

use candid::Principal;
use openapi_client::models::CanisterRow;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;
use crate::ic::types::parse_principal;

/// Database id of a canister row.
///
/// Distinct from the IC principal: REST calls take this id, actor calls take
/// the principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanisterRecordId(String);

impl CanisterRecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanisterRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A canister registered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canister {
    pub id: CanisterRecordId,
    pub ic_canister_id: Principal,
    pub name: Option<String>,
}

impl TryFrom<CanisterRow> for Canister {
    type Error = AgentError;

    fn try_from(row: CanisterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            ic_canister_id: parse_principal(&row.ic_canister_id)?,
            id: CanisterRecordId::new(row.id),
            name: row.name,
        })
    }
}
