use super::draw_from_cumulative;
use crate::config::Tables;
use crate::utils::cumsum_in_place;
use rand::Rng;

/// The inhomogeneous jump kernel.
///
/// The jump distribution out of the current state is rebuilt at every draw
/// from the ratio of expected holding times, so it tracks the holding draws
/// the stepper writes back onto the diagonal of `RT` in continuous-time
/// mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct GillespieKernel;

impl GillespieKernel {
    pub fn next_state<R: Rng>(&self, tables: &Tables, from: usize, rng: &mut R) -> usize {
        let k = tables.states;
        let here = tables.rt[(from, from)];
        if here <= 0.0 {
            // Degenerate holding table (non-ergodic fallback): stay put.
            return from;
        }
        let mut q: Vec<f64> = (0..k)
            .map(|j| {
                if j == from {
                    0.0
                } else {
                    tables.rt[(j, j)] / here
                }
            })
            .collect();
        cumsum_in_place(&mut q);
        let total = q[k - 1];
        if total <= 0.0 {
            return from;
        }
        for c in q.iter_mut() {
            *c /= total;
        }
        draw_from_cumulative(&q, rng)
    }
}
