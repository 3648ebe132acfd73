#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! [braincell](crate) simulates neurons which are built from compartments, ion species and ion
//! channels.
//!
//! Every compartment carries a membrane potential.
//! Channels conduct currents depending on this potential, their gating variables and the ions
//! they are attached to.
//! Channels which depend on more than one ion species are supported.
//! All state variables of a neuron form one system of ordinary differential equations which is
//! advanced by a selectable [Solver](braincell_core::solvers::Solver).
//! Neurons can be connected into networks which exchange spikes after a delay.
//!
//! ```
//! use braincell::prelude::*;
//!
//! let neuron = SingleCompartment::hodgkin_huxley()?;
//! let network = Network::new(vec![neuron], 0.01)?;
//! let settings = Settings::new(FixedStepsize::from_save_steps(0.0, 0.01, 2000, 100)?);
//! let result = run_simulation(network, |_, _| 10.0, &settings)?;
//! assert!(result.spike_counts()[0] > 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use braincell_building_blocks as building_blocks;

pub use braincell_concepts as concepts;

pub use braincell_core as core;

/// Re-exports the default simulation types and traits.
pub mod prelude;
