//! Neuron kernels: LIF, VIF and their calcium-adapting (`*CA`) variants.
//!
//! Each kernel brings a neuron's state up to date at an arbitrary query
//! time (`integrate_to`), applies an incoming synaptic weight
//! (`apply_input`), and checks/commits a threshold crossing (`try_emit`).
//! All three operations share one parameter layout per [`NeuronKind`]:
//!
//! - LIF / VIF: `[decay, theta, h, tarp, init_type]`
//! - LIFCA / VIFCA: `[decay, theta, h, tarp, alpha_c, tau_c, g_c, init_type]`
//!
//! `decay` is `Tau` (membrane time constant, ms) for the LIF family and
//! `Beta` (linear decay rate, mV/ms) for the VIF family.

use perseo_core::{InitType, Neuron, NeuronKind, Timex};

const IDX_DECAY: usize = 0;
const IDX_THETA: usize = 1;
const IDX_H: usize = 2;
const IDX_TARP: usize = 3;
const IDX_ALPHA_C: usize = 4;
const IDX_TAU_C: usize = 5;
const IDX_G_C: usize = 6;
const IDX_INIT_TYPE_NOCA: usize = 4;
const IDX_INIT_TYPE_CA: usize = 7;

/// Resolves a population's `init_type` parameter into a starting membrane
/// potential.
pub fn initial_state(kind: NeuronKind, params: &[f64], reset_value: f64) -> perseo_core::Result<f64> {
    let idx = if kind.has_calcium() { IDX_INIT_TYPE_CA } else { IDX_INIT_TYPE_NOCA };
    match InitType::from_param(params[idx], kind)? {
        InitType::Reset => Ok(reset_value),
        InitType::Resting => Ok(0.0),
    }
}

/// Brings `neuron` up to date at time `t`, applying its subthreshold
/// dynamics (and, for the `*CA` kinds, calcium decay) over the elapsed
/// interval. Does nothing if `t` does not follow `neuron.t_last_update`.
pub fn integrate_to(kind: NeuronKind, params: &[f64], neuron: &mut Neuron, t: Timex) {
    let dt = t.diff_ms(neuron.t_last_update);
    if dt <= 0.0 {
        return;
    }

    if kind.has_calcium() {
        integrate_calcium_family(kind, params, neuron, t, dt);
    } else {
        integrate_simple_family(kind, params, neuron, dt);
    }
    neuron.t_last_update = t;
}

fn integrate_simple_family(kind: NeuronKind, params: &[f64], neuron: &mut Neuron, dt: f64) {
    let decay = params[IDX_DECAY];
    let v = neuron.v();
    let v = if kind.is_linear_leak() {
        (v - decay * dt).max(0.0)
    } else {
        v * (-dt / decay).exp()
    };
    neuron.set_v(v);
}

/// Brings a calcium-adapting neuron's membrane potential and calcium level
/// up to date over `dt`. Calcium couples directly into `V`'s update (not
/// into the threshold, see [`effective_threshold`]), and the coupling term
/// differs between the two calcium-adapting kinds:
///
/// - LIFCA: the closed-form solution of the two linear ODEs `V' = -V/Tau -
///   gC*C` and `C' = -C/TauC`, so `V` decays on its own exponential *and*
///   carries a term driven by calcium's own decay.
/// - VIFCA: `V` still leaks linearly at `Beta`, but is additionally nudged
///   by the calcium level's decrement over the interval, scaled by `gC*TauC`.
fn integrate_calcium_family(kind: NeuronKind, params: &[f64], neuron: &mut Neuron, t: Timex, dt: f64) {
    let decay = params[IDX_DECAY];
    let tau_c = params[IDX_TAU_C];
    let g_c = params[IDX_G_C];

    // Refractory clamp: while still inside the absolute refractory window,
    // the membrane potential sits pinned at the reset value and only
    // calcium keeps decaying.
    let refractory_dt = if t <= neuron.refractory_until {
        dt
    } else {
        neuron.refractory_until.diff_ms(neuron.t_last_update).max(0.0).min(dt)
    };
    let active_dt = dt - refractory_dt;

    // Calcium decays on its own exponential throughout; whether that
    // decay is split across the refractory/active boundary or applied in
    // one shot makes no difference (the factors compose), so the
    // calcium-before-the-active-interval value is all the V update needs.
    let c0 = neuron.calcium() * (-refractory_dt / tau_c).exp();

    if active_dt > 0.0 {
        let erc = (-active_dt / tau_c).exp();
        let v = neuron.v();
        let new_v = if kind.is_linear_leak() {
            // VIFCA: plain linear leak plus the linear calcium-coupling
            // correction driven by how much calcium decayed this interval.
            (v - decay * active_dt - g_c * tau_c * (c0 - c0 * erc)).max(0.0)
        } else {
            // LIFCA: closed-form two-timescale coupled solution.
            let erm = (-active_dt / decay).exp();
            v * erm - g_c * (tau_c * decay) / (tau_c - decay) * c0 * (erc - erm)
        };
        neuron.set_v(new_v);
        neuron.set_calcium(c0 * erc);
    } else {
        neuron.set_calcium(c0);
    }
}

/// Firing threshold. Calcium never enters here: `gC` couples calcium
/// directly into the membrane potential in [`integrate_calcium_family`],
/// and both calcium-adapting kinds check the raw, unmodified `Theta`.
pub fn effective_threshold(_kind: NeuronKind, params: &[f64], _neuron: &Neuron) -> f64 {
    params[IDX_THETA]
}

/// Adds an incoming synaptic weight to the membrane potential, reflecting
/// at zero for the linear-leak (`VIF`/`VIFCA`) kinds. Does not check
/// threshold crossing; the driver calls [`try_emit`] separately once all of
/// a delivery's coincident inputs have been applied.
pub fn apply_input(kind: NeuronKind, neuron: &mut Neuron, weight: f64) {
    let v = neuron.v() + weight;
    let v = if kind.is_linear_leak() { v.max(0.0) } else { v };
    neuron.set_v(v);
}

/// Checks whether `neuron` has crossed its effective threshold and, if so,
/// commits the reset/refractory bookkeeping. Neurons inside their
/// refractory window never emit.
pub fn try_emit(kind: NeuronKind, params: &[f64], neuron: &mut Neuron, t: Timex) -> bool {
    if t < neuron.refractory_until {
        return false;
    }
    if neuron.v() < effective_threshold(kind, params, neuron) {
        return false;
    }

    let h = params[IDX_H];
    let tarp = params[IDX_TARP];
    neuron.set_v(h);
    neuron.t_last_emit = t;
    neuron.refractory_until = t.advance_ms(tarp);

    if kind.has_calcium() {
        // Tr = t: the update anchor stays at the spike time; integrate_to's
        // refractory clamp handles the dormant interval on the next call.
        neuron.t_last_update = t;
        let alpha_c = params[IDX_ALPHA_C];
        neuron.set_calcium(neuron.calcium() + alpha_c);
    } else {
        // Tr = t + Tarp: skip the refractory interval outright so the next
        // integration step sees zero elapsed time within it.
        neuron.t_last_update = neuron.refractory_until;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use perseo_core::PopulationId;

    fn lif_params() -> Vec<f64> {
        // Tau=20, Theta=20, H=10, Tarp=2, init_type=0 (reset)
        vec![20.0, 20.0, 10.0, 2.0, 0.0]
    }

    fn lifca_params() -> Vec<f64> {
        // Tau=20, Theta=20, H=10, Tarp=2, AlphaC=0.5, TauC=100, gC=2, init_type=0
        vec![20.0, 20.0, 10.0, 2.0, 0.5, 100.0, 2.0, 0.0]
    }

    #[test]
    fn lif_decays_exponentially_towards_zero() {
        let params = lif_params();
        let mut n = Neuron::at_rest(PopulationId::new(0), 15.0);
        integrate_to(NeuronKind::Lif, &params, &mut n, Timex::from_millis(20.0));
        assert!((n.v() - 15.0 * (-1f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn vif_reflects_at_zero() {
        let params = vec![1.0, 20.0, 10.0, 2.0, 0.0];
        let mut n = Neuron::at_rest(PopulationId::new(0), 0.5);
        integrate_to(NeuronKind::Vif, &params, &mut n, Timex::from_millis(10.0));
        assert_eq!(n.v(), 0.0);
    }

    #[test]
    fn crossing_threshold_resets_and_sets_refractory_window() {
        let params = lif_params();
        let mut n = Neuron::at_rest(PopulationId::new(0), 25.0);
        let t = Timex::from_millis(5.0);
        assert!(try_emit(NeuronKind::Lif, &params, &mut n, t));
        assert_eq!(n.v(), 10.0);
        assert_eq!(n.refractory_until, Timex::from_millis(7.0));
        assert_eq!(n.t_last_update, Timex::from_millis(7.0));
    }

    #[test]
    fn refractory_neuron_does_not_emit() {
        let params = lif_params();
        let mut n = Neuron::at_rest(PopulationId::new(0), 25.0);
        n.refractory_until = Timex::from_millis(10.0);
        assert!(!try_emit(NeuronKind::Lif, &params, &mut n, Timex::from_millis(5.0)));
    }

    #[test]
    fn lifca_spike_raises_calcium_and_keeps_update_anchor_at_spike_time() {
        let params = lifca_params();
        let mut n = Neuron::at_rest(PopulationId::new(0), 25.0);
        let t = Timex::from_millis(5.0);
        assert!(try_emit(NeuronKind::LifCa, &params, &mut n, t));
        assert_eq!(n.calcium(), 0.5);
        assert_eq!(n.t_last_update, t);
    }

    #[test]
    fn effective_threshold_ignores_calcium() {
        let params = lifca_params();
        let mut n = Neuron::at_rest(PopulationId::new(0), 0.0);
        n.set_calcium(1.0);
        assert_eq!(effective_threshold(NeuronKind::LifCa, &params, &n), params[IDX_THETA]);
    }

    #[test]
    fn lifca_calcium_couples_into_the_closed_form_v_update() {
        // Tau=20, Theta=20, H=10, Tarp=2, AlphaC=0.5, TauC=100, gC=2, init_type=0
        let params = lifca_params();
        let mut n = Neuron::at_rest(PopulationId::new(0), 10.0);
        n.set_calcium(1.0);
        integrate_to(NeuronKind::LifCa, &params, &mut n, Timex::from_millis(10.0));

        let (tau, tau_c, g_c, c0, dt) = (20.0, 100.0, 2.0, 1.0, 10.0);
        let erm = (-dt / tau).exp();
        let erc = (-dt / tau_c).exp();
        let expected_v = 10.0 * erm - g_c * (tau_c * tau) / (tau_c - tau) * c0 * (erc - erm);
        let expected_c = c0 * erc;
        assert!((n.v() - expected_v).abs() < 1e-9);
        assert!((n.calcium() - expected_c).abs() < 1e-9);
    }

    #[test]
    fn vifca_leak_and_calcium_coupling_never_drive_v_negative() {
        let params = vec![1.0, 20.0, 10.0, 2.0, 0.5, 100.0, 2.0, 0.0];
        let mut n = Neuron::at_rest(PopulationId::new(0), 0.1);
        n.set_calcium(5.0);
        integrate_to(NeuronKind::VifCa, &params, &mut n, Timex::from_millis(50.0));
        assert!(n.v() >= 0.0);
    }

    #[test]
    fn apply_input_reflects_vif_at_zero_but_not_lif() {
        let mut vif = Neuron::at_rest(PopulationId::new(0), 0.5);
        apply_input(NeuronKind::Vif, &mut vif, -10.0);
        assert_eq!(vif.v(), 0.0);

        let mut lif = Neuron::at_rest(PopulationId::new(0), 0.5);
        apply_input(NeuronKind::Lif, &mut lif, -10.0);
        assert_eq!(lif.v(), -9.5);
    }

    proptest::proptest! {
        #[test]
        fn vif_apply_input_is_never_negative(start in 0.0f64..50.0, weight in -100.0f64..100.0) {
            let mut n = Neuron::at_rest(PopulationId::new(0), start);
            apply_input(NeuronKind::Vif, &mut n, weight);
            prop_assert!(n.v() >= 0.0);
        }
    }
}
