//! Dormitory housing desk: student applications, weighted criterion scoring,
//! a global ranking, capacity-based admission rounds, sequential room
//! allocation, and an appeal track for rejected applicants.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
