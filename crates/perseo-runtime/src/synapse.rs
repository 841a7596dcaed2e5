//! Synapse kernels: the fixed-efficacy kernel and the two bistable plastic
//! kernels (AF, gated on postsynaptic membrane potential; TWAM, gated on a
//! postsynaptic spike-timing window).
//!
//! A synapse never stores its efficacy directly. Instead each long-term
//! state (depressed/potentiated) indexes a shared 256-entry
//! [`perseo_core::EfficacyLut`] built once per connectivity entry, and the
//! synapse only carries the `u8` index plus (for the plastic kernels) the
//! continuous internal variable `VJ` that drifts between the two states.
//!
//! Parameter layout for `Af`/`Twam` (length 13):
//! `[J0, J1, DJ0, DJ1, AlphaJ, BetaJ, ThetaJ, gate, JumpUp, JumpDown, RBup, RBdown, R0]`
//! where `gate` is `ThetaV` for `Af` and `PotWindow` for `Twam`.

use perseo_core::RandomStream;

const IDX_ALPHA_J: usize = 4;
const IDX_BETA_J: usize = 5;
const IDX_THETA_J: usize = 6;
/// `ThetaV` for `Af`, `PotWindow` for `Twam`; interpreted by the driver,
/// which knows the kind.
pub const IDX_GATE: usize = 7;
const IDX_JUMP_UP: usize = 8;
const IDX_JUMP_DOWN: usize = 9;
const IDX_RB_UP: usize = 10;
const IDX_RB_DOWN: usize = 11;
const IDX_R0: usize = 12;

/// A synapse's efficacy-selection state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynapseState {
    /// Fixed kernel: a single LUT index drawn once and never mutated.
    Fixed {
        /// Index into the connectivity entry's single efficacy LUT.
        j_idx: u8,
    },
    /// AF or TWAM kernel: two candidate LUT indices (depressed,
    /// potentiated) plus the continuous variable that drifts between them.
    Plastic {
        /// LUT index used while depressed (`VJ <= ThetaJ`).
        j0_idx: u8,
        /// LUT index used while potentiated (`VJ > ThetaJ`).
        j1_idx: u8,
        /// Continuous internal state variable.
        vj: f32,
    },
}

impl SynapseState {
    /// Draws a freshly constructed fixed-kernel synapse.
    pub fn new_fixed(rng: &mut RandomStream) -> Self {
        SynapseState::Fixed { j_idx: rng.uniform_index(256) as u8 }
    }

    /// Draws a freshly constructed plastic-kernel synapse, placing it in
    /// the potentiated state with probability `params[IDX_R0]`.
    pub fn new_plastic(params: &[f64], rng: &mut RandomStream) -> Self {
        let theta_j = params[IDX_THETA_J];
        let r0 = params[IDX_R0];
        let potentiated = rng.uniform() < r0;
        let vj = if potentiated { theta_j + 1.0 } else { theta_j - 1.0 };
        SynapseState::Plastic {
            j0_idx: rng.uniform_index(256) as u8,
            j1_idx: rng.uniform_index(256) as u8,
            vj: vj as f32,
        }
    }

    /// The LTP-state index (selecting one of the connectivity entry's
    /// efficacy LUTs) and the LUT index itself, for a fixed-kernel synapse.
    pub fn active_index(self) -> (usize, u8) {
        match self {
            SynapseState::Fixed { j_idx } => (0, j_idx),
            SynapseState::Plastic { .. } => {
                panic!("active_index called on a plastic synapse; drive it through update_plastic instead")
            }
        }
    }
}

/// Updates a plastic synapse's `VJ` on a presynaptic spike and returns the
/// LTP-state index (0 = depressed, 1 = potentiated; each state selects its
/// own efficacy LUT), the LUT index within it to use for this delivery, and
/// whether this update just crossed `ThetaJ` (`Some(true)` = crossed up into
/// potentiated, `Some(false)` = crossed down into depressed, `None` = no
/// state change).
///
/// `isi` is the presynaptic neuron's own inter-spike interval (the drift
/// timescale), and `potentiate` is the kernel-specific gating test: for AF,
/// whether the postsynaptic membrane potential exceeded `ThetaV`; for TWAM,
/// whether the postsynaptic neuron last fired within `PotWindow`.
pub fn update_plastic(state: &mut SynapseState, params: &[f64], isi: f64, potentiate: bool) -> (usize, u8, Option<bool>) {
    let SynapseState::Plastic { j0_idx, j1_idx, vj } = state else {
        panic!("update_plastic called on a non-plastic synapse state")
    };

    let theta_j = params[IDX_THETA_J];
    let alpha_j = params[IDX_ALPHA_J];
    let beta_j = params[IDX_BETA_J];
    let jump_up = params[IDX_JUMP_UP];
    let jump_down = params[IDX_JUMP_DOWN];
    let rb_up = params[IDX_RB_UP];
    let rb_down = params[IDX_RB_DOWN];

    let mut vj64 = *vj as f64;
    let flag_before = vj64 > theta_j;

    vj64 += if flag_before { alpha_j * isi } else { -beta_j * isi };
    vj64 = vj64.clamp(rb_down, rb_up);

    vj64 += if potentiate { jump_up } else { -jump_down };
    vj64 = vj64.clamp(rb_down, rb_up);

    *vj = vj64 as f32;
    let flag_after = vj64 > theta_j;

    let transition = if flag_after == flag_before { None } else { Some(flag_after) };

    if flag_after {
        (1, *j1_idx, transition)
    } else {
        (0, *j0_idx, transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn af_params() -> Vec<f64> {
        // J0 J1 DJ0 DJ1 AlphaJ BetaJ ThetaJ gate JumpUp JumpDown RBup RBdown R0
        vec![0.1, 0.5, 0.1, 0.1, 0.01, 0.01, 0.0, -50.0, 1.0, 1.0, 2.0, -2.0, 0.5]
    }

    #[test]
    fn fixed_state_index_never_changes() {
        let mut rng = RandomStream::new(1);
        let s = SynapseState::new_fixed(&mut rng);
        assert_eq!(s.active_index(), s.active_index());
    }

    #[test]
    fn sustained_potentiation_drives_vj_up_and_selects_j1() {
        let params = af_params();
        let mut state = SynapseState::Plastic { j0_idx: 3, j1_idx: 9, vj: -1.0 };
        let (ltp_state, idx, transition) = update_plastic(&mut state, &params, 5.0, true);
        assert_eq!((ltp_state, idx), (1, 9));
        assert_eq!(transition, Some(true));
    }

    #[test]
    fn sustained_depression_drives_vj_down_and_selects_j0() {
        let params = af_params();
        let mut state = SynapseState::Plastic { j0_idx: 3, j1_idx: 9, vj: 1.0 };
        let (ltp_state, idx, transition) = update_plastic(&mut state, &params, 5.0, false);
        assert_eq!((ltp_state, idx), (0, 3));
        assert_eq!(transition, Some(false));
    }

    #[test]
    fn repeated_potentiation_reports_no_further_transition() {
        let params = af_params();
        let mut state = SynapseState::Plastic { j0_idx: 3, j1_idx: 9, vj: 1.0 };
        let (_, _, first) = update_plastic(&mut state, &params, 5.0, true);
        let (_, _, second) = update_plastic(&mut state, &params, 5.0, true);
        assert_eq!(first, Some(true));
        assert_eq!(second, None);
    }

    #[test]
    fn vj_never_leaves_the_reflecting_bounds() {
        let params = af_params();
        let mut state = SynapseState::Plastic { j0_idx: 0, j1_idx: 1, vj: 1.9 };
        for _ in 0..100 {
            update_plastic(&mut state, &params, 50.0, true);
        }
        if let SynapseState::Plastic { vj, .. } = state {
            assert!(vj <= 2.0 + 1e-6);
        }
    }
}
