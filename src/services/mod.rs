pub mod habits;
pub mod ledger;
pub mod locks;
pub mod stats;
pub mod streak;
