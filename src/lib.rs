//! Warrior Sim - Monte-Carlo DPS simulator for a dual-wield fury warrior
//!
//! A single fight is a discrete-event simulation driven by a time-ordered
//! queue; batches of fights run in parallel on a rayon pool and are merged
//! into an [`AggregateResult`].

pub mod buffs;
pub mod config;
pub mod damage;
pub mod error;
pub mod policy;
pub mod procs;
pub mod rage;
pub mod scheduler;
pub mod simulation;
pub mod stats;
pub mod target;
pub mod warrior;

#[cfg(feature = "python")]
mod python;

pub use config::*;
pub use error::{ConfigError, Result, SimError};
pub use simulation::*;
pub use stats::*;
pub use warrior::Warrior;
