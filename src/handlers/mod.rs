pub mod characters;
pub mod ranking;
pub mod routines;
pub mod users;
