use rand::Rng;

/// Returns an exponentially distributed deviate of the provided mean,
/// computed by inversion: `-mean * ln U(0,1)`.
pub fn exp_dev<R: Rng>(rng: &mut R, mean: f64) -> f64 {
    // gen() samples [0, 1); flip to (0, 1] so the logarithm stays finite.
    let u: f64 = 1.0 - rng.gen::<f64>();
    -mean * u.ln()
}

/// Replaces each element with the sum of all elements up to and including it.
pub fn cumsum_in_place(values: &mut [f64]) {
    let mut acc = 0.0;
    for v in values.iter_mut() {
        acc += *v;
        *v = acc;
    }
}

/// Sum of the provided slice.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean of the provided slice, or zero if it is empty.
pub fn avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        sum(values) / (values.len() as f64)
    }
}

/// Largest element of the provided slice, or zero if it is empty.
pub fn max(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |m, &v| if v > m { v } else { m })
}

/// Converts mixed-radix digits (least significant first) into a flat index.
pub fn mixed_radix_index(digits: &[usize], dims: &[usize]) -> usize {
    let mut idx = 0;
    let mut stride = 1;
    for (d, digit) in digits.iter().enumerate() {
        idx += digit * stride;
        stride *= dims[d];
    }
    idx
}

/// Converts a flat index back into mixed-radix digits (least significant first).
pub fn mixed_radix_digits(index: usize, dims: &[usize]) -> Vec<usize> {
    let mut digits = Vec::with_capacity(dims.len());
    let mut rem = index;
    for &dim in dims {
        digits.push(rem % dim);
        rem /= dim;
    }
    digits
}

/// Generates the Cartesian product `[0, dims[0]) × … × [0, dims[D-1])` as a
/// list of digit vectors, ordered by their mixed-radix index.
pub fn permutations(dims: &[usize]) -> Vec<Vec<usize>> {
    let count: usize = dims.iter().product();
    let mut all = Vec::with_capacity(count);
    for idx in 0..count {
        all.push(mixed_radix_digits(idx, dims));
    }
    all
}

/// Same as [`permutations`] but maps each component through the provided
/// normalizing callback `(digit, dim) -> f64`.
pub fn permutations_map<F>(dims: &[usize], norm: F) -> Vec<Vec<f64>>
where
    F: Fn(usize, usize) -> f64,
{
    permutations(dims)
        .into_iter()
        .map(|digits| {
            digits
                .iter()
                .zip(dims.iter())
                .map(|(&digit, &dim)| norm(digit, dim))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn exp_dev_sample_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 200_000;
        let mean = 2.5;
        let total: f64 = (0..n).map(|_| exp_dev(&mut rng, mean)).sum();
        let sample_mean = total / (n as f64);
        // Convergence at rate 1/sqrt(n): allow a wide multiple of the std error.
        assert!(
            (sample_mean - mean).abs() < 10.0 * mean / (n as f64).sqrt(),
            "sample mean {} too far from {}",
            sample_mean,
            mean
        );
    }

    #[test]
    fn cumsum_monotone() {
        let mut row = vec![0.25, 0.25, 0.5];
        cumsum_in_place(&mut row);
        assert_eq!(row, vec![0.25, 0.5, 1.0]);
    }

    #[test]
    fn radix_round_trip() {
        let dims = [2, 6, 4];
        for idx in 0..48 {
            let digits = mixed_radix_digits(idx, &dims);
            assert_eq!(mixed_radix_index(&digits, &dims), idx);
        }
    }

    #[test]
    fn permutations_cover_grid() {
        let dims = [2, 6, 4];
        let all = permutations(&dims);
        assert_eq!(all.len(), 48);
        for digits in &all {
            for (d, &digit) in digits.iter().enumerate() {
                assert!(digit < dims[d]);
            }
        }
        // All vectors distinct.
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j]);
            }
        }
    }

    #[test]
    fn permutations_normalized() {
        let normed = permutations_map(&[2, 6, 4], |i, dim| (i as f64) / (dim as f64));
        for v in &normed {
            for &x in v {
                assert!((0.0..1.0).contains(&x));
            }
        }
    }
}
