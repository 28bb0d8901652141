extern crate approx;
extern crate stochast;

use approx::assert_abs_diff_eq;
use std::collections::HashMap;
use stochast::config::{EngineConfig, EmissionSpec, ProcessSpec, SymbolSpec};
use stochast::{Engine, EngineError};

fn dense_two_state() -> ProcessSpec {
    ProcessSpec::Dense(vec![vec![0.1, 0.9], vec![0.1, 0.9]])
}

#[test]
fn resolved_rows_sum_to_one() {
    let cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.25, 0.25],
        vec![0.5, 0.0, 0.5],
        vec![0.25, 0.25, 0.5],
    ]));
    let engine = Engine::with_seed(&cfg, 1).unwrap();
    for i in 0..3 {
        let sum: f64 = (0..3).map(|j| engine.tables.p[(i, j)]).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn cumulative_rows_are_monotone_and_closed() {
    let cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.2, 0.5, 0.3],
        vec![0.4, 0.1, 0.5],
        vec![0.3, 0.3, 0.4],
    ]));
    let engine = Engine::with_seed(&cfg, 1).unwrap();
    let cum = &engine.tables.cum_p;
    for i in 0..3 {
        let mut prev = 0.0;
        for j in 0..3 {
            assert!(cum[(i, j)] >= prev);
            prev = cum[(i, j)];
        }
        assert_abs_diff_eq!(cum[(i, 2)], 1.0, epsilon = 1e-9);
    }
}

#[test]
fn export_reconfigure_round_trip() {
    let cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.25, 0.25],
        vec![0.5, 0.0, 0.5],
        vec![0.25, 0.25, 0.5],
    ]));
    let first = Engine::with_seed(&cfg, 1).unwrap();
    let exported = first.tables.transition_matrix();

    let second_cfg = EngineConfig::new(ProcessSpec::Dense(exported));
    let second = Engine::with_seed(&second_cfg, 2).unwrap();
    for i in 0..3 {
        assert_abs_diff_eq!(
            second.tables.eq_probs[i],
            first.tables.eq_probs[i],
            epsilon = 1e-9
        );
        for j in 0..3 {
            assert_abs_diff_eq!(
                second.tables.rt[(i, j)],
                first.tables.rt[(i, j)],
                epsilon = 1e-9
            );
        }
    }
}

#[test]
fn amplitudes_normalize_to_upper_triangle() {
    // Three amplitudes resolve to a symmetric three-state chain.
    let cfg = EngineConfig::new(ProcessSpec::Alpha(vec![2.0, 3.0, 5.0]));
    let engine = Engine::with_seed(&cfg, 1).unwrap();
    let p = &engine.tables.p;
    assert_eq!(engine.tables.states, 3);
    assert_abs_diff_eq!(p[(0, 1)], 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(p[(1, 0)], 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(p[(0, 2)], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(p[(1, 2)], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(p[(0, 0)], 0.5, epsilon = 1e-12);
}

#[test]
fn sparse_composite_keys_over_grid() {
    // A 2x2 product state space declared through the emission grid.
    let mut rows = HashMap::new();
    let mut from = HashMap::new();
    from.insert("1,0".to_string(), 0.4);
    from.insert("1,1".to_string(), 0.1);
    rows.insert("0,0".to_string(), from);

    let mut cfg = EngineConfig::new(ProcessSpec::Sparse { states: 4, rows });
    cfg.emission = Some(EmissionSpec::Dims {
        dims: vec![2, 2],
        weights: vec![1.0, 1.0],
    });
    let engine = Engine::with_seed(&cfg, 1).unwrap();
    let p = &engine.tables.p;
    assert_abs_diff_eq!(p[(0, 1)], 0.4, epsilon = 1e-12);
    assert_abs_diff_eq!(p[(0, 3)], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(p[(0, 0)], 0.5, epsilon = 1e-12);
}

#[test]
fn sparse_key_rank_mismatch_is_fatal() {
    let mut rows = HashMap::new();
    rows.insert("0,1,1".to_string(), HashMap::new());
    let mut cfg = EngineConfig::new(ProcessSpec::Sparse { states: 4, rows });
    cfg.emission = Some(EmissionSpec::Dims {
        dims: vec![2, 2],
        weights: vec![1.0, 1.0],
    });
    match Engine::with_seed(&cfg, 1) {
        Err(EngineError::Config(_)) => (),
        other => panic!("expected a config error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn row_sum_violation_is_fatal() {
    let cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.6, 0.6],
        vec![0.5, 0.5],
    ]));
    assert!(matches!(
        Engine::with_seed(&cfg, 1),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn symbol_array_resolves_reverse_index() {
    let mut cfg = EngineConfig::new(dense_two_state());
    cfg.symbols = Some(SymbolSpec::Names(vec!["lo".to_string(), "hi".to_string()]));
    let engine = Engine::with_seed(&cfg, 1).unwrap();
    assert_eq!(engine.tables.symbols.index_of("hi"), Some(1));
    assert_eq!(engine.tables.symbols.name_of(0), Some("lo"));
}

#[test]
fn correlation_labels_are_zero_mean() {
    let cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.25, 0.25],
        vec![0.5, 0.0, 0.5],
        vec![0.25, 0.25, 0.5],
    ]));
    let engine = Engine::with_seed(&cfg, 1).unwrap();
    assert_eq!(engine.tables.corr_map, vec![0, 1, -1]);
}

#[test]
fn stateless_process_rejects_state_options() {
    let mut cfg = EngineConfig::new(ProcessSpec::Wiener { steps_per_unit: 10 });
    cfg.symbols = Some(SymbolSpec::Count(2));
    assert!(matches!(
        Engine::with_seed(&cfg, 1),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn emission_grid_must_cover_states() {
    let mut cfg = EngineConfig::new(dense_two_state());
    cfg.emission = Some(EmissionSpec::Dims {
        dims: vec![3],
        weights: vec![1.0],
    });
    assert!(matches!(
        Engine::with_seed(&cfg, 1),
        Err(EngineError::Config(_))
    ));
}
