use crate::{CalcError, IonInfo, IonKind};

/// Conductance pathway through the membrane.
///
/// A channel owns no state itself. Its gating variables are stored by the compartment which
/// hands out the matching slice on every call. This allows solvers to evaluate channels at
/// intermediate states without mutating them.
///
/// # Ions
/// The list returned by [Channel::ions] determines which [IonInfo]s are passed on every call.
/// They are given in the same order.
/// The first entry is the root ion which the channel current is attributed to.
/// Further entries only modulate the channel, such as calcium for calcium-activated potassium
/// channels.
/// Channels which do not depend on any ion (leak) return an empty list and are handed an empty
/// slice.
pub trait Channel {
    /// Human-readable identifier used in error messages.
    fn name(&self) -> &str;

    /// Ion species which are required by this channel.
    fn ions(&self) -> &[IonKind];

    /// Number of gating variables.
    fn n_gates(&self) -> usize;

    /// Sets the gating variables to their steady state at the given potential.
    fn steady_state(&self, v: f64, ions: &[IonInfo], gates: &mut [f64])
        -> Result<(), CalcError>;

    /// Calculates the time derivative of the gating variables.
    ///
    /// The diagonal of the jacobian $\partial \dot{g}_i / \partial g_i$ is written into `decay`.
    fn calculate_gate_increment(
        &self,
        v: f64,
        ions: &[IonInfo],
        gates: &[f64],
        dgates: &mut [f64],
        decay: &mut [f64],
    ) -> Result<(), CalcError>;

    /// Current density (µA/cm²) through the channel, positive if inward.
    fn current(&self, v: f64, ions: &[IonInfo], gates: &[f64]) -> f64;

    /// Effective conductance $-\partial I / \partial V$ (mS/cm²).
    ///
    /// Defaults to a finite difference of [Channel::current].
    fn conductance(&self, v: f64, ions: &[IonInfo], gates: &[f64]) -> f64 {
        let h = 1e-6;
        -(self.current(v + h, ions, gates) - self.current(v, ions, gates)) / h
    }

    /// Projects the gating variables back into their admissible range.
    ///
    /// By default, every gating variable is clamped into $[0, 1]$.
    fn normalize_gates(&self, gates: &mut [f64]) {
        gates.iter_mut().for_each(|g| *g = g.clamp(0.0, 1.0));
    }
}
