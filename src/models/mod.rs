pub mod character;
pub mod ranking;
pub mod routine;
pub mod user;
