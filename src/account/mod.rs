//! Cards, their owners, and validated identifiers

pub mod models;
pub mod validation;

pub use models::{Account, OwnerProfile};
pub use validation::{AccountNumber, Identity, ValidationError};
