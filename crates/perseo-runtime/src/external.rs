//! External Poisson spike generation.
//!
//! Each population is driven by one pooled external spike train: the
//! superposition of `C_ext` independent Poisson processes at rate `nu_ext`
//! onto every neuron is itself Poisson, so rather than simulating
//! `C_ext * N` individual trains the whole population's drive collapses
//! into a single exponential inter-arrival process with rate
//! `nu_ext * C_ext * N`, landing on a uniformly random neuron each time.

use perseo_core::{NeuronId, Population, RandomStream, Timex};

/// Draws the next external spike arrival for `population` and advances its
/// `next_external_spike` cursor, returning the neuron it lands on.
///
/// Returns `None` if the population's external drive is disabled
/// (`nu_ext == 0`).
pub fn advance_external_spike(population: &mut Population, rng: &mut RandomStream) -> Option<NeuronId> {
    if !population.inv_nu_ext.is_finite() {
        return None;
    }
    let target = rng.uniform_index(population.neurons.len()) as u32;
    let inter_arrival_ms = population.inv_nu_ext * rng.exponential();
    population.next_external_spike = population.next_external_spike.advance_ms(inter_arrival_ms);
    population.spike_counter += 1;
    // Population-local index; the driver offsets it into the global neuron space.
    Some(NeuronId::new(target))
}

/// Draws the external synaptic weight delivered by one external spike, from
/// the population's external-weight LUT.
pub fn external_weight(population: &Population, lut_index: u8) -> f32 {
    population.ext_weight_lut.get(lut_index)
}

/// Time of the earliest pending external spike across every population,
/// and the population it belongs to.
pub fn earliest_external(populations: &[Population]) -> Option<(usize, Timex)> {
    populations
        .iter()
        .filter(|p| p.inv_nu_ext.is_finite())
        .map(|p| (p.id.index(), p.next_external_spike))
        .min_by_key(|&(_, t)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perseo_core::{EfficacyLut, PopulationId};

    fn population(nu_ext: f64) -> Population {
        let mut rng = RandomStream::new(1);
        let mut p = Population {
            id: PopulationId::new(0),
            j_ext: 1.0,
            dj_ext: 0.0,
            c_ext: 1.0,
            nu_ext,
            inv_nu_ext: 0.0,
            next_external_spike: Timex::ZERO,
            spike_counter: 0,
            params: vec![],
            ext_weight_lut: EfficacyLut::build_gaussian(&mut rng, 1.0, 0.1),
            neurons: vec![perseo_core::Neuron::at_rest(PopulationId::new(0), 0.0); 100],
        };
        p.recompute_inv_nu_ext();
        p
    }

    #[test]
    fn disabled_drive_never_advances() {
        let mut p = population(0.0);
        let mut rng = RandomStream::new(2);
        assert!(advance_external_spike(&mut p, &mut rng).is_none());
    }

    #[test]
    fn enabled_drive_advances_time_and_counter() {
        let mut p = population(1000.0);
        let mut rng = RandomStream::new(2);
        let before = p.next_external_spike;
        let target = advance_external_spike(&mut p, &mut rng).unwrap();
        assert!(p.next_external_spike > before);
        assert_eq!(p.spike_counter, 1);
        assert!((target.raw() as usize) < p.neurons.len());
    }
}
