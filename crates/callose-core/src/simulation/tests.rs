use super::*;
use crate::infection::INITIAL_INFECTION_LOAD;
use crate::pharmacokinetics::concentration;
use crate::testing::FixedRng;
use std::str::FromStr;
use strum::IntoEnumIterator;

fn small_config(size: usize, pre: usize, post: usize) -> SimConfig {
    SimConfig {
        grid_size: size,
        pre_treatment_steps: pre,
        post_treatment_steps: post,
        initial_cell: Some([size / 2, size / 2]),
        ..SimConfig::default()
    }
}

struct FailingRecorder;

impl Recorder for FailingRecorder {
    fn record_step(&mut self, _scenario: Scenario, _record: &StepRecord) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
}

#[test]
fn scenario_names_round_trip() {
    assert_eq!(Scenario::from_str("control"), Ok(Scenario::Control));
    assert_eq!(Scenario::from_str("CTX"), Ok(Scenario::Ctx));
    assert_eq!(Scenario::Tetra.to_string(), "tetra");
    assert!(Scenario::from_str("all").is_err());
    assert_eq!(Scenario::iter().count(), 3);
}

#[test]
fn invalid_config_fails_before_any_run() {
    let config = SimConfig {
        grid_size: 0,
        ..SimConfig::default()
    };
    assert!(matches!(
        Simulation::new(config),
        Err(SimulationError::Config(SimConfigError::InvalidGridSize { .. }))
    ));
}

#[test]
fn stepping_requires_initialization_and_stops_at_completion() {
    let mut sim = Simulation::new(small_config(6, 1, 1)).unwrap();
    assert_eq!(sim.phase(), RunPhase::Idle);
    assert!(matches!(sim.step(), Err(SimulationError::NotInitialized)));

    sim.initialize(Scenario::Control);
    assert_eq!(sim.phase(), RunPhase::Initialized);
    sim.step().unwrap();
    assert_eq!(sim.phase(), RunPhase::Running { day: 1 });
    sim.step().unwrap();
    assert_eq!(sim.phase(), RunPhase::Completed);
    assert!(matches!(
        sim.step(),
        Err(SimulationError::RunCompleted { steps: 2 })
    ));
}

#[test]
fn initialization_seeds_one_cell_and_clears_callose() {
    for size in [1, 3, 10, 50] {
        let config = SimConfig {
            grid_size: size,
            pre_treatment_steps: 3,
            post_treatment_steps: 3,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        sim.run(Scenario::Ctx, &mut NullRecorder).unwrap();
        assert_eq!(sim.doses().times(), &[0.0]);

        sim.initialize(Scenario::Control);
        let infected: Vec<f64> = sim
            .infection()
            .field()
            .data()
            .iter()
            .copied()
            .filter(|&v| v > 0.0)
            .collect();
        assert_eq!(infected, vec![INITIAL_INFECTION_LOAD]);
        assert!(sim.callose().field().data().iter().all(|&c| c == 0.0));
        assert!(sim.doses().is_empty());
        assert_eq!(sim.drug_concentration(), 0.0);
    }
}

#[test]
fn fields_stay_bounded_in_every_scenario() {
    let config = SimConfig {
        signal_radius: 3,
        spread_rate: 0.3,
        ..small_config(16, 40, 60)
    };
    for scenario in Scenario::iter() {
        let mut sim = Simulation::new(config.clone()).unwrap();
        let mut recorder = MemoryRecorder::new(true);
        sim.run(scenario, &mut recorder).unwrap();
        assert_eq!(recorder.steps.len(), 100);
        assert_eq!(recorder.frames.len(), 100);
        for frame in &recorder.frames {
            for cell in frame.cells() {
                assert!(
                    (0.0..=config.carrying_capacity).contains(&cell.infection),
                    "{scenario} day {}: infection {}",
                    frame.day,
                    cell.infection
                );
                assert!(
                    (0.0..=config.callose_limit).contains(&cell.callose),
                    "{scenario} day {}: callose {}",
                    frame.day,
                    cell.callose
                );
                assert!(cell.infection == 0.0 || cell.infection >= 1e-3);
            }
        }
    }
}

#[test]
fn blocked_spread_leaves_a_pure_logistic_trajectory() {
    let config = SimConfig {
        initial_cell: Some([5, 5]),
        spread_rate: 0.07,
        growth_rate: 0.15,
        ..small_config(10, 5, 0)
    };
    let mut sim = Simulation::with_rng(config.clone(), FixedRng(u64::MAX)).unwrap();
    let mut recorder = MemoryRecorder::new(true);
    let summary = sim.run(Scenario::Control, &mut recorder).unwrap();

    let mut load = INITIAL_INFECTION_LOAD;
    for (record, frame) in recorder.steps.iter().zip(&recorder.frames) {
        let delta = config.growth_rate * load * (1.0 - load / config.carrying_capacity)
            - config.infection_death_rate * load
            - config.callose_suppression * 0.0 * load;
        load += delta;
        assert!((record.mean_infection - load / 100.0).abs() < 1e-15);
        assert_eq!(record.drug_concentration, 0.0);
        let infected: Vec<_> = frame.cells().filter(|c| c.infection > 0.0).collect();
        assert_eq!(infected.len(), 1);
        assert_eq!((infected[0].i, infected[0].j), (5, 5));
        assert_eq!(infected[0].callose, 0.0);
    }
    assert_eq!(summary.final_infected_cells, 1);
    assert_eq!(summary.steps, 5);
}

#[test]
fn newly_infected_cells_receive_no_callose_that_day() {
    let config = small_config(9, 1, 0);
    let mut sim = Simulation::with_rng(config, FixedRng(0)).unwrap();
    sim.initialize(Scenario::Control);
    sim.step().unwrap();

    let grid = sim.grid().clone();
    let infection = sim.infection().field();
    let callose = sim.callose().field();
    assert_eq!(sim.infection().infected_cells(), 5);
    assert_eq!(callose.get(4, 4), 0.0);
    for (ni, nj) in grid.neighbors(4, 4) {
        assert!(infection.get(ni, nj) > 0.0);
        assert_eq!(callose.get(ni, nj), 0.0);
    }
    // Healthy ring around the infected cross.
    assert_eq!(callose.count_where(|c| c > 0.0), 8);
    for i in 0..9 {
        for j in 0..9 {
            if callose.get(i, j) > 0.0 {
                assert_eq!(infection.get(i, j), 0.0);
                assert!(grid
                    .neighbors(i, j)
                    .iter()
                    .any(|&(ni, nj)| infection.get(ni, nj) > 0.0));
            }
        }
    }
}

#[test]
fn ctx_concentration_peaks_at_tmax_then_decays() {
    let config = small_config(10, 2, 40);
    let params = config.ctx;
    let mut sim = Simulation::new(config).unwrap();
    let mut recorder = MemoryRecorder::new(false);
    let summary = sim.run(Scenario::Ctx, &mut recorder).unwrap();

    let conc: Vec<f64> = recorder.steps.iter().map(|r| r.drug_concentration).collect();
    assert_eq!(conc[0], 0.0);
    assert_eq!(conc[1], 0.0);
    assert_eq!(conc[2], 0.0, "absorption starts from zero on the dosing day");
    assert!(conc[3] > 0.0);
    assert_eq!(conc[2 + 14], params.dose);
    for day in (2 + 15)..conc.len() {
        assert!(conc[day] < conc[day - 1], "day {day}");
    }
    assert_eq!(summary.peak_drug_concentration, params.dose);
    assert_eq!(sim.doses().times(), &[0.0]);
}

#[test]
fn control_run_never_doses() {
    let mut sim = Simulation::new(small_config(8, 3, 10)).unwrap();
    let mut recorder = MemoryRecorder::new(false);
    sim.run(Scenario::Control, &mut recorder).unwrap();
    assert!(sim.doses().is_empty());
    assert!(recorder.steps.iter().all(|r| r.drug_concentration == 0.0));
}

#[test]
fn extra_doses_superpose() {
    let config = small_config(10, 0, 60);
    let p = config.ctx;
    let mut sim = Simulation::new(config).unwrap();
    sim.initialize(Scenario::Ctx);
    let mut records = vec![sim.step().unwrap()];
    sim.administer_dose(20.0).unwrap();
    assert!(matches!(
        sim.administer_dose(5.0),
        Err(SimulationError::Dose(DoseScheduleError::OutOfOrder { .. }))
    ));
    while sim.phase() != RunPhase::Completed {
        records.push(sim.step().unwrap());
    }

    for record in &records {
        let t = record.day as f64;
        let expected = concentration(p.dose, t, p.t_max, p.half_life)
            + concentration(p.dose, t - 20.0, p.t_max, p.half_life);
        assert!((record.drug_concentration - expected).abs() < 1e-12);
    }
    assert!(records[40].drug_concentration > p.dose);
}

#[test]
fn tetracycline_inhibition_saturates() {
    let p = DrugParams::tetracycline();
    assert_eq!(Scenario::Tetra.spread_inhibition(&p, 0.0), 0.0);
    assert_eq!(Scenario::Tetra.spread_inhibition(&p, 1e-10), 0.0);
    assert_eq!(Scenario::Tetra.spread_inhibition(&p, p.ec50), 1.0);
    let low = Scenario::Tetra.spread_inhibition(&p, 0.1);
    let expected = saturation(0.1, p.ec50, p.hill_n) * p.kill_scale;
    assert!((low - expected).abs() < 1e-15 && low < 1.0);
    assert_eq!(Scenario::Ctx.spread_inhibition(&DrugParams::ctx(), 1.0), 0.0);
    assert_eq!(Scenario::Control.spread_inhibition(&p, 1.0), 0.0);
}

#[test]
fn runs_are_reproducible_for_fixed_seed() {
    let config = SimConfig {
        initial_cell: None,
        seed: 2024,
        ..small_config(20, 30, 30)
    };
    let mut a = MemoryRecorder::new(false);
    let mut b = MemoryRecorder::new(false);
    let summary_a = Simulation::new(config.clone())
        .unwrap()
        .run(Scenario::Tetra, &mut a)
        .unwrap();
    let summary_b = Simulation::new(config)
        .unwrap()
        .run(Scenario::Tetra, &mut b)
        .unwrap();
    assert_eq!(a.steps, b.steps);
    assert_eq!(summary_a.initial_cell, summary_b.initial_cell);
}

#[test]
fn frames_broadcast_drug_and_follow_row_major_order() {
    let mut sim = Simulation::new(small_config(4, 1, 20)).unwrap();
    let mut recorder = MemoryRecorder::new(true);
    sim.run(Scenario::Tetra, &mut recorder).unwrap();

    assert_eq!(recorder.frames.len(), 21);
    for (frame, record) in recorder.frames.iter().zip(&recorder.steps) {
        assert_eq!(frame.day, record.day);
        let cells: Vec<CellRecord> = frame.cells().collect();
        assert_eq!(cells.len(), 16);
        assert_eq!((cells[5].i, cells[5].j), (1, 1));
        assert_eq!((cells[15].i, cells[15].j), (3, 3));
        assert!(cells.iter().all(|c| c.drug == record.drug_concentration));
        let mean = cells.iter().map(|c| c.infection).sum::<f64>() / 16.0;
        assert!((mean - record.mean_infection).abs() < 1e-12);
    }
}

#[test]
fn recorder_failure_aborts_the_run() {
    let mut sim = Simulation::new(small_config(5, 2, 2)).unwrap();
    let err = sim.run(Scenario::Control, &mut FailingRecorder).unwrap_err();
    assert!(matches!(err, SimulationError::Recorder(_)));
    assert!(err.source().is_some());
}

#[test]
fn summary_serializes_with_lowercase_scenario() {
    let mut sim = Simulation::new(small_config(5, 1, 1)).unwrap();
    let summary = sim.run(Scenario::Tetra, &mut NullRecorder).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["scenario"], "tetra");
    assert_eq!(json["steps"], 2);
    assert_eq!(json["final_record"]["day"], 1);
}

#[test]
fn extra_doses_wait_for_the_treatment_start_dose() {
    let mut sim = Simulation::new(small_config(6, 3, 30)).unwrap();
    assert!(matches!(
        sim.administer_dose(10.0),
        Err(SimulationError::NotInitialized)
    ));
    sim.initialize(Scenario::Ctx);
    for _ in 0..3 {
        assert!(matches!(
            sim.administer_dose(10.0),
            Err(SimulationError::TreatmentNotStarted { treatment_start: 3 })
        ));
        sim.step().unwrap();
    }
    // Day 3 has not been simulated yet.
    assert!(matches!(
        sim.administer_dose(10.0),
        Err(SimulationError::TreatmentNotStarted { .. })
    ));
    assert!(sim.doses().is_empty());

    sim.step().unwrap();
    sim.administer_dose(10.0).unwrap();
    let mut days = 4;
    while sim.phase() != RunPhase::Completed {
        sim.step().unwrap();
        days += 1;
    }
    assert_eq!(days, 33);
    assert_eq!(sim.doses().times(), &[0.0, 10.0]);
    assert!(matches!(
        sim.administer_dose(40.0),
        Err(SimulationError::RunCompleted { steps: 33 })
    ));
}

#[test]
fn control_rejects_doses() {
    let mut sim = Simulation::new(small_config(6, 0, 5)).unwrap();
    sim.initialize(Scenario::Control);
    sim.step().unwrap();
    assert!(matches!(
        sim.administer_dose(1.0),
        Err(SimulationError::NoTreatment {
            scenario: Scenario::Control
        })
    ));
    assert!(sim.doses().is_empty());
}
