#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! # braincell - Building Blocks
//!
//! Building blocks allow users to quickly construct compartmental neuron models.
//! Ion pools are contained in [ions], channels in [channels] and both are combined into
//! [compartments].
//!
//! ```rust
//! # use braincell_building_blocks::prelude::*;
//! # use braincell_concepts::Neuron;
//! let membrane = Membrane::new(
//!     vec![IonModel::from(SodiumFixed::default()), PotassiumFixed::default().into()],
//!     vec![
//!         ChannelModel::from(NaTM1991::default()),
//!         KTM1991::default().into(),
//!         Leak::default().into(),
//!     ],
//! )?;
//! let neuron = SingleCompartment::new(1.0, membrane)?.with_threshold(-20.0);
//! assert_eq!(neuron.spike_threshold(), -20.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//! Channels which depend on more than one ion species such as [KCaAhp](channels::KCaAhp) list
//! all of them. The first one is the root ion which receives their current.

pub mod channels;
pub mod compartments;
pub mod ions;
pub mod units;

/// Handy re-exports of every building block.
pub mod prelude;
