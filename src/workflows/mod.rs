pub mod housing;
pub mod roster;
