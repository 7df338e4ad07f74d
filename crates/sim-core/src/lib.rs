//! Deterministic multi-team business simulation core.
//!
//! Everything in this crate is a pure function of (state, decisions, seed):
//! the RNG is re-derived per (seed, round), the reducer is an ordered fold,
//! and clamping is the final authority on every bounded field. The crate
//! emits structured events and narrative instead of logging; orchestration
//! and persistence live in the api crate.

pub mod events;
pub mod financials;
pub mod narrative;
pub mod reducer;
pub mod report;
pub mod rng;
pub mod roles;
pub mod run;
pub mod scorecard;

pub use reducer::{advance_round, new_team_state, RoundOutcome};
pub use rng::SeededRng;
pub use run::{ReplayError, RunError, RunManager, RunSetup};
