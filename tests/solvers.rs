extern crate approx;
extern crate stochast;

use approx::assert_abs_diff_eq;
use stochast::linalg::from_rows;
use stochast::solvers::{first_absorption, mean_recurrence};

#[test]
fn textbook_three_state_recurrence() {
    // pg.406 ex.1: eqP = [0.4, 0.2, 0.4], H diagonal [2.5, 5, 2.5].
    let p = from_rows(&[
        vec![0.5, 0.25, 0.25],
        vec![0.5, 0.0, 0.5],
        vec![0.25, 0.25, 0.5],
    ])
    .unwrap();
    let rec = mean_recurrence(&p);
    assert!(rec.ergodic);
    assert_abs_diff_eq!(rec.eq_probs[0], 0.4, epsilon = 1e-9);
    assert_abs_diff_eq!(rec.eq_probs[1], 0.2, epsilon = 1e-9);
    assert_abs_diff_eq!(rec.eq_probs[2], 0.4, epsilon = 1e-9);
    assert_abs_diff_eq!(rec.h[(0, 0)], 2.5, epsilon = 1e-9);
    assert_abs_diff_eq!(rec.h[(1, 1)], 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rec.h[(2, 2)], 2.5, epsilon = 1e-9);
}

#[test]
fn recurrence_diagonal_inverts_equilibrium() {
    let p = from_rows(&[
        vec![0.2, 0.5, 0.3],
        vec![0.4, 0.1, 0.5],
        vec![0.3, 0.3, 0.4],
    ])
    .unwrap();
    let rec = mean_recurrence(&p);
    assert!(rec.ergodic);
    for i in 0..3 {
        assert_abs_diff_eq!(rec.h[(i, i)], 1.0 / rec.eq_probs[i], epsilon = 1e-9);
    }
    let total: f64 = rec.eq_probs.iter().sum();
    assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
}

#[test]
fn absorbing_chain_is_not_ergodic() {
    // State 2 is absorbing: the recurrence subsystem is singular and the
    // solver degrades to a zero H with a uniform equilibrium.
    let p = from_rows(&[
        vec![0.1, 0.8, 0.1],
        vec![0.1, 0.9, 0.0],
        vec![0.0, 0.0, 1.0],
    ])
    .unwrap();
    let rec = mean_recurrence(&p);
    assert!(!rec.ergodic);
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(rec.h[(i, j)], 0.0);
        }
        assert_abs_diff_eq!(rec.eq_probs[i], 1.0 / 3.0, epsilon = 1e-12);
    }
}

#[test]
fn single_state_boundary() {
    let p = from_rows(&[vec![1.0]]).unwrap();
    let rec = mean_recurrence(&p);
    assert_eq!(rec.h[(0, 0)], 1.0);
    assert_eq!(rec.eq_probs[0], 1.0);
}

#[test]
fn five_state_gambler_absorption() {
    let p = from_rows(&[
        vec![1.0, 0.0, 0.0, 0.0, 0.0],
        vec![0.5, 0.0, 0.5, 0.0, 0.0],
        vec![0.0, 0.5, 0.0, 0.5, 0.0],
        vec![0.0, 0.0, 0.5, 0.0, 0.5],
        vec![0.0, 0.0, 0.0, 0.0, 1.0],
    ])
    .unwrap();
    let ab = first_absorption(&p);
    assert_eq!(ab.states, vec![1, 5]);
    assert_abs_diff_eq!(ab.times[0], 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ab.times[1], 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ab.times[2], 3.0, epsilon = 1e-9);
    let expected = [[0.75, 0.25], [0.5, 0.5], [0.25, 0.75]];
    for i in 0..3 {
        for j in 0..2 {
            assert_abs_diff_eq!(ab.probs[(i, j)], expected[i][j], epsilon = 1e-9);
        }
    }
}

#[test]
fn absorption_rows_sum_to_one() {
    let p = from_rows(&[
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.3, 0.2, 0.4, 0.1],
        vec![0.1, 0.3, 0.4, 0.2],
        vec![0.0, 0.0, 0.0, 1.0],
    ])
    .unwrap();
    let ab = first_absorption(&p);
    assert_eq!(ab.probs.nrows(), 2);
    for i in 0..ab.probs.nrows() {
        let sum: f64 = (0..ab.probs.ncols()).map(|j| ab.probs[(i, j)]).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
    }
}
