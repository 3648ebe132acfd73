#![deny(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! This crate collects objects and methods needed to run a numerical simulation of
//! neurons which satisfy the given [concepts](braincell_concepts).
//!
//! ## Solvers
//! Every neuron is a system of ordinary differential equations described by the
//! [DiffEqModule](braincell_concepts::DiffEqModule) trait.
//! The [Solver](solvers::Solver) enum selects the numerical scheme which advances it in time.
//! Explicit Runge-Kutta methods as well as exponential Euler methods are available.
//!
//! ## Networks
//! Neurons are connected by [Projection](network::Projection)s which deliver spikes after a
//! given delay.
//! A [Network](network::Network) steps all neurons in parallel with [rayon].
//!
//! ## Simulation and Storage
//! The [run_simulation](simulation::run_simulation) function advances a network with a
//! [TimeStepper](time::TimeStepper) and records potentials and currents of every neuron at the
//! requested iterations.
//! Results are exported by the [storage] module as json or ron files or kept in memory.

mod errors;

pub mod network;
pub mod simulation;
pub mod solvers;
pub mod storage;
pub mod time;

pub use errors::*;

#[doc(hidden)]
pub use rayon;

#[cfg(feature = "tracing")]
#[doc(hidden)]
pub use tracing;
