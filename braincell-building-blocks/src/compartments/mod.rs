//! Compartments combine ion pools and channels with a membrane potential.
//!
//! A [Membrane] describes which ions and channels share one patch of membrane and how their
//! states are laid out.
//! [SingleCompartment] models an isopotential neuron while [MultiCompartment] discretizes a
//! branched [Morphology] into coupled compartments.

mod membrane;
mod morphology;
mod multi;
mod single;

pub use membrane::*;
pub use morphology::*;
pub use multi::*;
pub use single::*;
