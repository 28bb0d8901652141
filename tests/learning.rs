extern crate stochast;

use stochast::config::{EngineConfig, ProcessSpec, SymbolSpec};
use stochast::pipeline::{Event, EventBody, LearnEvent, SliceFeed};
use stochast::Engine;

/// A deterministic, time-ordered two-state stream of 35 events.
fn canned_events() -> Vec<LearnEvent> {
    let mut events = Vec::with_capacity(35);
    for i in 0..35usize {
        let member = (i * 7) % 50;
        let symbol = if (i / 2) % 2 == 0 { "0" } else { "1" };
        let t = 0.1 * ((i + 1) as f64);
        let x = if symbol == "1" { 1.5 } else { 0.5 };
        events.push(LearnEvent::new(member, symbol, t).with_obs(x, 0.25, 0.0));
    }
    events
}

fn two_state_config() -> EngineConfig {
    let mut cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.5],
        vec![0.5, 0.5],
    ]));
    cfg.members = 50;
    cfg
}

#[test]
fn supervised_end_to_end() {
    let mut cfg = two_state_config();
    cfg.batch = 50;
    let mut engine = Engine::with_seed(&cfg, 101).unwrap();
    let mut feed = SliceFeed::new(canned_events(), 10);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store).unwrap();

    let end = store.last().expect("the run must emit events");
    if let EventBody::End { stats } = &end.body {
        // Every ingested event is one observed transition.
        let total: f64 = stats.tr_counts.iter().flatten().sum();
        assert_eq!(total, 35.0);
        for row in &stats.mle_tr_probs {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                assert!((sum - 1.0).abs() < 1e-9, "row sums to {}", sum);
            }
        }
    } else {
        panic!("expected an end event, got {}", end.kind());
    }
}

#[test]
fn every_event_becomes_a_jump() {
    let cfg = two_state_config();
    let mut engine = Engine::with_seed(&cfg, 103).unwrap();
    let mut feed = SliceFeed::new(canned_events(), 7);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store).unwrap();

    let jumps: Vec<&Event> = store.iter().filter(|e| e.kind() == "jump").collect();
    assert_eq!(jumps.len(), 35);
    // Jump events inherit the source event times, in order.
    let mut prev = 0.0;
    for jump in &jumps {
        assert!(jump.t >= prev);
        prev = jump.t;
    }
    // Observations land in the accumulator for the emission estimator.
    assert_eq!(engine.obslist.len(), 35);
    assert_eq!(engine.obslist[0], vec![0.5, 0.25, 0.0]);
}

#[test]
fn undeclared_symbol_maps_to_state_zero() {
    let mut cfg = two_state_config();
    cfg.symbols = Some(SymbolSpec::Names(vec!["a".to_string(), "b".to_string()]));
    let mut engine = Engine::with_seed(&cfg, 107).unwrap();
    let events = vec![
        LearnEvent::new(0, "b", 0.1),
        LearnEvent::new(0, "mystery", 0.2),
    ];
    let mut feed = SliceFeed::new(events, 10);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store).unwrap();
    assert_eq!(engine.ensemble.u[0], 0);
    assert_eq!(engine.ensemble.uk[0], 2.0);
}

#[test]
fn stateless_learning_accumulates_values() {
    let mut cfg = EngineConfig::new(ProcessSpec::Wiener { steps_per_unit: 10 });
    cfg.members = 3;
    let mut engine = Engine::with_seed(&cfg, 109).unwrap();
    let events = vec![
        LearnEvent::new(0, "1.5", 0.1),
        LearnEvent::new(0, "2.0", 0.2),
        LearnEvent::new(2, "0.25", 0.3),
    ];
    let mut feed = SliceFeed::new(events, 2);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store).unwrap();
    assert_eq!(engine.ensemble.uval[0], 3.5);
    assert_eq!(engine.ensemble.uval[1], 0.0);
    assert_eq!(engine.ensemble.uval[2], 0.25);
    // Stateless ingestion emits no jump events.
    assert!(store.iter().all(|e| e.kind() != "jump"));
}

#[test]
fn halted_engine_stops_pulling() {
    let cfg = two_state_config();
    let mut engine = Engine::with_seed(&cfg, 113).unwrap();
    engine.halt();
    let mut feed = SliceFeed::new(canned_events(), 10);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store).unwrap();
    // Only the configuration and the terminal report: no batch was pulled.
    let counts = store.iter().filter(|e| e.kind() == "jump").count();
    assert_eq!(counts, 0);
    assert_eq!(store.first().unwrap().kind(), "config");
    assert_eq!(store.last().unwrap().kind(), "end");
}

#[test]
fn learning_batch_reports() {
    let mut cfg = two_state_config();
    cfg.batch = 2;
    let mut engine = Engine::with_seed(&cfg, 127).unwrap();
    let mut feed = SliceFeed::new(canned_events(), 10);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store).unwrap();
    // 35 events in batches of 10 make 4 steps; reports land after steps 1
    // and 3.
    let batches = store.iter().filter(|e| e.kind() == "batch").count();
    assert_eq!(batches, 2);
}
