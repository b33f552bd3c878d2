//! Fixtures shared by the test modules

use candid::{Nat, Principal};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use hosty_agent::authn::session_token::{SessionClaims, SessionToken};
use hosty_agent::ic::types::{CanisterRunStatus, CanisterStatus, DefiniteCanisterSettings};
use hosty_agent::models::canister::{Canister, CanisterRecordId};
use hosty_agent::models::deployment::{Deployment, DeploymentStatus};

pub fn status(cycles: u64, burned_per_day: Option<u64>) -> CanisterStatus {
    CanisterStatus {
        status: CanisterRunStatus::Running,
        settings: DefiniteCanisterSettings {
            controllers: vec![Principal::anonymous()],
            compute_allocation: Nat::from(0u64),
            memory_allocation: Nat::from(0u64),
            freezing_threshold: Nat::from(2_592_000u64),
        },
        module_hash: Some(vec![0xde, 0xad]),
        memory_size: Nat::from(1_024u64),
        cycles: Nat::from(cycles),
        idle_cycles_burned_per_day: burned_per_day.map(Nat::from),
        memory_metrics: None,
    }
}

/// Distinct, valid canister principal for index `n`
pub fn principal(n: u8) -> Principal {
    Principal::from_slice(&[0, 0, 0, 0, 0, 0, 0, n, 1, 1])
}

pub fn canister(n: u8) -> Canister {
    Canister {
        id: CanisterRecordId::new(format!("row-{}", n)),
        ic_canister_id: principal(n),
        name: Some(format!("site-{}", n)),
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn deployment(id: &str, status: DeploymentStatus, updated_secs: i64) -> Deployment {
    Deployment {
        id: id.to_string(),
        canister_id: CanisterRecordId::new("row-1"),
        status,
        status_reason: None,
        build_command: Some("npm run build".to_string()),
        output_dir: Some("dist".to_string()),
        source_type: None,
        build_logs: String::new(),
        created_at: at(0),
        updated_at: at(updated_secs),
    }
}

pub fn token(sub: &str, exp_offset: i64) -> SessionToken {
    let claims = SessionClaims {
        sub: sub.to_string(),
        email: None,
        role: Some("authenticated".to_string()),
        exp: Utc::now().timestamp() + exp_offset,
        iat: None,
    };
    let raw = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
    SessionToken::from_raw(raw).unwrap()
}
