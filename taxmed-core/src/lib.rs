//! taxmed-core: canonical expense records, the household roster, and aggregation.

pub mod aggregate;
pub mod expense;
pub mod roster;

pub use aggregate::{aggregate, filter_year};
pub use expense::{Category, ExpenseItem, Provider};
pub use roster::{EmptyRosterError, RosterContext};
