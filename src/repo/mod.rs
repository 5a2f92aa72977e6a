//! Repository functions: the only code that talks to the persistence
//! adapter. Domain logic goes through these, never through raw queries.
//! Mutating entry points are written against a caller-provided connection so
//! a whole update-on-read pass shares one transaction.

pub mod accounts;
pub mod actions;
pub mod bodies;
pub mod debris;
pub mod fleets;
pub mod players;
pub mod reports;
pub mod universes;
