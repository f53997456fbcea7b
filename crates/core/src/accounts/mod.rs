//! Chart of accounts.
//!
//! - Account classes and their natural debit/credit side
//! - Validated, class-prefixed account codes and scheme remapping
//! - Opening balances attached to a period start
//! - Explicit collaborator links (`donation.general` -> account)

pub mod account;
pub mod class;
pub mod code;
pub mod link;
pub mod opening;
pub mod registry;

pub use account::{Account, NewAccount};
pub use class::{AccountClass, NormalSide};
pub use code::{AccountCode, AccountCodeError, CodeScheme};
pub use link::AccountLink;
pub use opening::{OpeningBalance, OpeningTotals};
pub use registry::AccountRegistry;
