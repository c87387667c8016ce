use core::fmt;

use serde::{Deserialize, Serialize};

pub mod event;
pub mod reward;
pub mod user;
pub mod vendor;

use user::User;
use vendor::Vendor;

/// The two disjoint principal kinds. No hierarchy, no cross-privilege; a
/// token minted for one kind never resolves against the other's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Vendor,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Vendor => write!(f, "vendor"),
        }
    }
}

/// A live, store-resolved identity attached to a request by the auth gate.
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Vendor(Vendor),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Vendor(_) => PrincipalKind::Vendor,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Principal::User(u) => u.user_id.0,
            Principal::Vendor(v) => v.vendor_id.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PrincipalKind::User).unwrap(),
            "\"user\""
        );
        assert_eq!(
            serde_json::to_string(&PrincipalKind::Vendor).unwrap(),
            "\"vendor\""
        );
    }

    #[test]
    fn kind_roundtrips() {
        let kind: PrincipalKind = serde_json::from_str("\"vendor\"").unwrap();
        assert_eq!(kind, PrincipalKind::Vendor);
    }
}
