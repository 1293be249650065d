use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Token amounts, in the smallest unit of the payment token.
pub type Amount = u64;

/// An account on the ledger: the admin, a buyer, or the custody account itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Address(Uuid);

impl Address {
    /// The zero address. Never a valid admin or candidate.
    pub const ZERO: Address = Address(Uuid::nil());

    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random account, used for custody accounts and in tests.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0.simple())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for Address {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for Address {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
