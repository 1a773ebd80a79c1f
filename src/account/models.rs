//! Card and owner-profile records

use rust_decimal::Decimal;
use serde::Serialize;

use super::validation::{AccountNumber, Identity};

/// A balance-holding card
///
/// Cards are opened outside this crate; transfers only read and re-balance them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub number: AccountNumber,
    pub owner: Identity,
    pub balance: Decimal,
}

/// Requesting identity together with the cards it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerProfile {
    pub identity: Identity,
    pub accounts: Vec<AccountNumber>,
}

impl OwnerProfile {
    pub fn owns(&self, number: &AccountNumber) -> bool {
        self.accounts.iter().any(|n| n == number)
    }
}
