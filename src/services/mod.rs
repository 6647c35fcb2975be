pub mod events;
pub mod identity;
pub mod ledger;
pub mod leveling;
pub mod progression;
pub mod ranking;
pub mod routine;
pub mod visitor;
