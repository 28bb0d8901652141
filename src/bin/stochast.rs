extern crate clap;
extern crate csv;
extern crate lazy_static;
extern crate log;
extern crate pretty_env_logger;
extern crate stochast;

use clap::{App, Arg};
use lazy_static::lazy_static;
use log::{error, info};
use std::collections::HashMap;
use std::env::{set_var, var};
use std::io;

use stochast::config::{EngineConfig, ProcessSpec};
use stochast::pipeline::{Event, EventBody, LearnEvent, SliceFeed};
use stochast::{Engine, EngineError};

const LOG_VAR: &str = "STOCHAST_LOG";

lazy_static! {
    /// The canned supervised stream: 35 time-ordered two-state events
    /// spread over 50 members.
    static ref SUPERVISED_EVENTS: Vec<LearnEvent> = {
        let mut events = Vec::with_capacity(35);
        for i in 0..35usize {
            let member = (i * 7) % 50;
            let symbol = if (i / 2) % 2 == 0 { "0" } else { "1" };
            let t = 0.1 * ((i + 1) as f64);
            let x = if symbol == "1" { 1.5 } else { 0.5 };
            events.push(LearnEvent::new(member, symbol, t).with_obs(x, 0.25, 0.0));
        }
        events
    };
}

fn main() -> Result<(), EngineError> {
    let app = App::new("stochast")
        .version("0.3.1")
        .author("Mara Kovand <mara@stochast.dev>")
        .about("Stochastic process simulation, ensemble statistics and MLE inference.")
        .arg(
            Arg::with_name("SCENARIO")
                .help("Scenario to run: R1, R2, R2.1, R2.3, R2.4, R3, R3.1, R3.2, R3.3, R4.1, R4.2")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("csv")
                .short("c")
                .long("csv")
                .takes_value(false)
                .help("Dump the per-step trace as CSV on stdout"),
        );

    let matches = app.get_matches();

    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "INFO");
    }
    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        println!("could not init logger");
    }

    let scenario = matches.value_of("SCENARIO").unwrap();
    info!("running scenario `{}`", scenario);

    let store = match scenario {
        "R1" => mean_recurrence_demo()?,
        "R2" => two_state_mle()?,
        "R2.1" => non_ergodic_demo()?,
        "R2.3" => gambler_absorption()?,
        "R2.4" => continuous_time_jumps()?,
        "R3" => supervised_learning(0)?,
        "R3.1" => stateless_learning()?,
        "R3.2" => filtered_learning()?,
        "R3.3" => supervised_learning(50)?,
        "R4.1" => spectral_intensity()?,
        "R4.2" => walks()?,
        unknown => {
            error!("unknown scenario `{}`", unknown);
            return Err(EngineError::Config(format!(
                "unknown scenario `{}`",
                unknown
            )));
        }
    };

    if matches.is_present("csv") {
        dump_steps(&store).map_err(|e| EngineError::Sink(e.to_string()))?;
    }

    for event in &store {
        if let EventBody::End { stats } = &event.body {
            println!("{}", stats);
        }
    }

    Ok(())
}

fn dump_steps(store: &[Event]) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());
    wtr.write_record(&["t", "s", "gamma", "walk"])?;
    for event in store {
        if let EventBody::Step { s, gamma, walk } = event.body {
            wtr.write_record(&[
                format!("{}", event.t),
                format!("{}", s),
                format!("{}", gamma),
                format!("{}", walk),
            ])?;
        }
    }
    wtr.flush()
}

/// Mean recurrence on the three-state textbook chain.
fn mean_recurrence_demo() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.25, 0.25],
        vec![0.5, 0.0, 0.5],
        vec![0.25, 0.25, 0.5],
    ]));
    cfg.members = 10;
    cfg.steps = 100;
    let mut engine = Engine::try_from_config(&cfg)?;
    info!("equilibrium: {:?}", engine.tables.eq_probs.as_slice());
    let mut store = Vec::new();
    engine.run(&mut store)?;
    Ok(store)
}

/// Two-state chain, recovering the declared transition probability.
fn two_state_mle() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.1, 0.9],
        vec![0.1, 0.9],
    ]));
    cfg.members = 500;
    cfg.steps = 500;
    cfg.batch = 100;
    let mut engine = Engine::try_from_config(&cfg)?;
    let mut store = Vec::new();
    engine.run(&mut store)?;
    Ok(store)
}

/// A chain with an absorbing state: the recurrence solver degrades with a
/// warning and the run continues.
fn non_ergodic_demo() -> Result<Vec<Event>, EngineError> {
    let mut rows = HashMap::new();
    let mut row0 = HashMap::new();
    row0.insert("1".to_string(), 0.8);
    row0.insert("2".to_string(), 0.1);
    rows.insert("0".to_string(), row0);
    let mut row1 = HashMap::new();
    row1.insert("0".to_string(), 0.1);
    rows.insert("1".to_string(), row1);

    let mut cfg = EngineConfig::new(ProcessSpec::Sparse { states: 3, rows });
    cfg.members = 20;
    cfg.steps = 50;
    let mut engine = Engine::try_from_config(&cfg)?;
    let mut store = Vec::new();
    engine.run(&mut store)?;
    Ok(store)
}

/// The five-state gambler's ruin: absorption times and probabilities.
fn gambler_absorption() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![1.0, 0.0, 0.0, 0.0, 0.0],
        vec![0.5, 0.0, 0.5, 0.0, 0.0],
        vec![0.0, 0.5, 0.0, 0.5, 0.0],
        vec![0.0, 0.0, 0.5, 0.0, 0.5],
        vec![0.0, 0.0, 0.0, 0.0, 1.0],
    ]));
    cfg.members = 100;
    cfg.steps = 200;
    let mut engine = Engine::try_from_config(&cfg)?;
    let ab = &engine.tables.absorption;
    info!(
        "absorbing states {:?}, expected times {:?}",
        ab.states,
        ab.times.as_slice()
    );
    let mut store = Vec::new();
    engine.run(&mut store)?;
    Ok(store)
}

/// Continuous-time holding draws over a gillespie kernel.
fn continuous_time_jumps() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Gillespie { states: 3 });
    cfg.members = 50;
    cfg.steps = 200;
    cfg.dt = 0.1;
    cfg.ctmode = true;
    cfg.rates = Some(vec![
        vec![0.0, 2.0, 1.0],
        vec![2.0, 0.0, 2.0],
        vec![1.0, 2.0, 0.0],
    ]);
    let mut engine = Engine::try_from_config(&cfg)?;
    let mut store = Vec::new();
    engine.run(&mut store)?;
    Ok(store)
}

/// Learns a two-state generator off the canned supervised stream.
fn supervised_learning(batch: usize) -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.5],
        vec![0.5, 0.5],
    ]));
    cfg.members = 50;
    cfg.batch = batch;
    let mut engine = Engine::try_from_config(&cfg)?;
    let mut feed = SliceFeed::new(SUPERVISED_EVENTS.clone(), 10);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store)?;
    Ok(store)
}

/// Learning in stateless mode: event states accumulate as values.
fn stateless_learning() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Wiener { steps_per_unit: 10 });
    cfg.members = 5;
    let mut engine = Engine::try_from_config(&cfg)?;
    let events: Vec<LearnEvent> = (0..20)
        .map(|i| LearnEvent::new(i % 5, "1.5", 0.05 * (i as f64 + 1.0)))
        .collect();
    let mut feed = SliceFeed::new(events, 4);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store)?;
    info!("accumulated values: {:?}", engine.ensemble.uval);
    Ok(store)
}

/// Learning with a user filter: only batch reports and the end block reach
/// the sink.
fn filtered_learning() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Dense(vec![
        vec![0.5, 0.5],
        vec![0.5, 0.5],
    ]));
    cfg.members = 50;
    cfg.batch = 2;
    let mut engine = Engine::try_from_config(&cfg)?;
    engine.set_filter(Box::new(|event: &Event| {
        matches!(event.body, EventBody::Batch { .. } | EventBody::End { .. })
    }));
    let mut feed = SliceFeed::new(SUPERVISED_EVENTS.clone(), 5);
    let mut store = Vec::new();
    engine.learn(&mut feed, &mut store)?;
    info!("{} filtered events delivered", store.len());
    Ok(store)
}

/// The spectral intensity generator over a short eigenbasis.
fn spectral_intensity() -> Result<Vec<Event>, EngineError> {
    let dim = 16;
    let vectors: Vec<Vec<f64>> = (1..=4)
        .map(|harmonic| {
            (0..dim)
                .map(|s| {
                    let phase = (harmonic as f64) * (s as f64) / (dim as f64);
                    (std::f64::consts::PI * phase).sin()
                })
                .collect()
        })
        .collect();
    let mut cfg = EngineConfig::new(ProcessSpec::Gauss {
        values: vec![1.0, 0.5, 0.25, 0.125],
        vectors,
        reference: 1.0,
        dim,
        mean: 40.0,
    });
    cfg.members = 10;
    cfg.steps = 32;
    cfg.dt = 0.05;
    let mut engine = Engine::try_from_config(&cfg)?;
    let mut store = Vec::new();
    engine.run(&mut store)?;
    Ok(store)
}

/// Brownian and Ornstein-Uhlenbeck walks, streamed through the pull pipe.
fn walks() -> Result<Vec<Event>, EngineError> {
    let mut cfg = EngineConfig::new(ProcessSpec::Wiener { steps_per_unit: 100 });
    cfg.members = 20;
    cfg.steps = 100;
    cfg.dt = 0.05;
    let engine = Engine::try_from_config(&cfg)?;
    let mut store: Vec<Event> = engine.stream().collect();

    let mut ou_cfg = EngineConfig::new(ProcessSpec::Ornstein {
        theta: 0.5,
        sigma: 1.0,
        steps_per_unit: 100,
    });
    ou_cfg.members = 20;
    ou_cfg.steps = 100;
    ou_cfg.dt = 0.05;
    let ou = Engine::try_from_config(&ou_cfg)?;
    store.extend(ou.stream());
    Ok(store)
}
