#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
//! This crate encapsulates concepts which govern a compartmental neuron model simulated by
//! [braincell](https://docs.rs/braincell).
//!
//! A neuron is composed of compartments which carry a membrane potential.
//! Every compartment contains [Ion] pools and [Channel]s which conduct currents depending on the
//! membrane potential, their gating variables and the ions they are attached to.
//! All of these contribute state variables to one system of ordinary differential equations which
//! is described by the [DiffEqModule] trait and advanced in time by a solver.

mod channel;
mod errors;
mod ion;
mod neuron;
mod state;

pub use channel::*;
pub use errors::*;
pub use ion::*;
pub use neuron::*;
pub use state::*;
