use super::draw_from_cumulative;
use crate::config::Tables;
use rand::Rng;

/// The memoryless chain kernel: one inverse-CDF draw over the cumulative
/// transition row of the current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkovKernel;

impl MarkovKernel {
    pub fn next_state<R: Rng>(&self, tables: &Tables, from: usize, rng: &mut R) -> usize {
        let k = tables.states;
        let row: Vec<f64> = (0..k).map(|j| tables.cum_p[(from, j)]).collect();
        draw_from_cumulative(&row, rng)
    }
}
