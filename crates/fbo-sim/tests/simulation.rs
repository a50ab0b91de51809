//! End-to-end runs of the closed loop, from configuration to artifact.

use faer::{mat, FaerMat, Mat};

use fbo_algo::{DualYOptimizer, Optimizer, OptimizerConfig, PrimalOptimizer};
use fbo_core::{NonlinearSystem, Polytope, System};
use fbo_sim::{Simulation, SimulationConfig};

/// `h(u) = 2u^2 + u^3` on `u in [-2, 0]` with `y <= 1.2` and the input
/// cost `0.2 u`; the constrained minimizer is `u* = -2` where `y = 0`.
fn cubic_plant() -> NonlinearSystem {
    NonlinearSystem::new(
        1,
        1,
        |u: &Mat<f64>| {
            let v = u.read(0, 0);
            mat![[2.0 * v * v + v * v * v]]
        },
        |u: &Mat<f64>| {
            let v = u.read(0, 0);
            mat![[4.0 * v + 3.0 * v * v]]
        },
    )
    .with_input_set(Polytope::new(mat![[1.0], [-1.0]], mat![[0.0], [2.0]]).unwrap())
    .unwrap()
    .with_output_set(Polytope::new(mat![[1.0]], mat![[1.2]]).unwrap())
    .unwrap()
}

fn cubic_primal(sys: &NonlinearSystem) -> Optimizer {
    let config = OptimizerConfig {
        lin_u: Some(mat![[0.2]]),
        alpha: Some(0.15),
        ..Default::default()
    };
    PrimalOptimizer::new(&config, sys).unwrap().into()
}

/// Identity plant with a wide output bound, for noise-path tests.
fn identity_plant() -> NonlinearSystem {
    NonlinearSystem::new(1, 1, |u: &Mat<f64>| u.clone(), |_: &Mat<f64>| mat![[1.0]])
        .with_input_set(Polytope::new(mat![[1.0], [-1.0]], mat![[1.0], [1.0]]).unwrap())
        .unwrap()
        .with_output_set(Polytope::new(mat![[1.0]], mat![[100.0]]).unwrap())
        .unwrap()
}

#[test]
fn primal_run_converges_on_the_cubic_plant() {
    let sys = cubic_plant();
    let opt = cubic_primal(&sys);
    let config = SimulationConfig {
        u_opt: Some(mat![[-2.0]]),
        ..SimulationConfig::new(200)
    };
    let run = Simulation::new(&opt, &sys, config).unwrap().run().unwrap();

    assert_eq!(run.records().len(), 201);
    assert!(run.fallback_steps().is_empty());

    let last = run.records().last().unwrap();
    let u = last.u.read(0, 0);
    assert!((-2.0 - 1e-6..=1e-6).contains(&u), "u left its box: {u}");
    assert!(last.y_violation <= 1e-3);
    assert!(last.d.unwrap() < 5e-2, "still far from u*: {}", last.d.unwrap());

    let summary = run.summary();
    assert_eq!(summary.optimizer, "Primal");
    assert_eq!(summary.n_steps, 200);
    assert_eq!(summary.fallback_steps, 0);
    assert!(summary.final_y_violation <= 1e-3);
}

#[test]
fn noisy_runs_of_different_lengths_share_a_prefix() {
    let sys = identity_plant();
    let config = OptimizerConfig {
        lin_u: Some(mat![[1.0]]),
        alpha: Some(0.1),
        ..Default::default()
    };
    let opt: Optimizer = PrimalOptimizer::new(&config, &sys).unwrap().into();

    let short = SimulationConfig {
        noise_seed: 7,
        noise_y_std: 0.05,
        ..SimulationConfig::new(10)
    };
    let long = SimulationConfig {
        n_steps: 20,
        ..short.clone()
    };
    let short_run = Simulation::new(&opt, &sys, short).unwrap().run().unwrap();
    let long_run = Simulation::new(&opt, &sys, long).unwrap().run().unwrap();

    for (a, b) in short_run.records().iter().zip(long_run.records()) {
        assert!((a.u.read(0, 0) - b.u.read(0, 0)).abs() < 1e-12);
        assert!((a.y.read(0, 0) - b.y.read(0, 0)).abs() < 1e-12);
    }
}

#[test]
fn zero_noise_runs_ignore_the_seed() {
    let sys = cubic_plant();
    let opt = cubic_primal(&sys);
    let a = SimulationConfig {
        noise_seed: 1,
        ..SimulationConfig::new(30)
    };
    let b = SimulationConfig {
        noise_seed: 99,
        ..a.clone()
    };
    let run_a = Simulation::new(&opt, &sys, a).unwrap().run().unwrap();
    let run_b = Simulation::new(&opt, &sys, b).unwrap().run().unwrap();
    for (ra, rb) in run_a.records().iter().zip(run_b.records()) {
        assert_eq!(ra.u.read(0, 0), rb.u.read(0, 0));
        assert_eq!(ra.phi, rb.phi);
    }
}

#[test]
fn logged_outputs_are_true_measurements_even_under_noise() {
    let sys = identity_plant();
    let config = OptimizerConfig {
        lin_u: Some(mat![[1.0]]),
        alpha: Some(0.1),
        ..Default::default()
    };
    let opt: Optimizer = PrimalOptimizer::new(&config, &sys).unwrap().into();
    let sim_config = SimulationConfig {
        noise_seed: 3,
        noise_y_std: 0.2,
        ..SimulationConfig::new(15)
    };
    let run = Simulation::new(&opt, &sys, sim_config).unwrap().run().unwrap();
    for r in run.records() {
        let true_y = sys.h(&r.u).read(0, 0);
        assert!((r.y.read(0, 0) - true_y).abs() < 1e-12, "log carries noise");
    }
}

#[test]
fn trajectory_frame_has_the_expected_schema() {
    let sys = cubic_plant();
    let opt = cubic_primal(&sys);
    let config = SimulationConfig {
        u_opt: Some(mat![[-2.0]]),
        ..SimulationConfig::new(5)
    };
    let run = Simulation::new(&opt, &sys, config).unwrap().run().unwrap();
    let df = run.to_dataframe().unwrap();

    assert_eq!(df.height(), 6);
    let names: Vec<&str> = df.get_column_names();
    assert_eq!(names, vec!["t", "u", "y", "phi", "y_violation", "d"]);
}

#[test]
fn multi_component_inputs_flatten_into_indexed_columns() {
    // Two inputs, one output: only u gets component suffixes.
    let sys = NonlinearSystem::new(
        2,
        1,
        |u: &Mat<f64>| mat![[u.read(0, 0) + u.read(1, 0)]],
        |_: &Mat<f64>| mat![[1.0, 1.0]],
    )
    .with_input_set(
        Polytope::new(
            mat![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]],
            mat![[1.0], [1.0], [1.0], [1.0]],
        )
        .unwrap(),
    )
    .unwrap();

    let config = OptimizerConfig {
        lin_u: Some(mat![[1.0], [1.0]]),
        alpha: Some(0.1),
        ..Default::default()
    };
    let opt: Optimizer = PrimalOptimizer::new(&config, &sys).unwrap().into();
    let run = Simulation::new(&opt, &sys, SimulationConfig::new(2))
        .unwrap()
        .run()
        .unwrap();
    let df = run.to_dataframe().unwrap();

    let names: Vec<&str> = df.get_column_names();
    assert_eq!(names, vec!["t", "u_0", "u_1", "y", "phi", "y_violation", "d"]);
}

#[test]
fn dual_variant_fields_become_columns() {
    let sys = cubic_plant();
    let config = OptimizerConfig {
        lin_u: Some(mat![[0.2]]),
        alpha: Some(0.15),
        ..Default::default()
    };
    let opt: Optimizer = DualYOptimizer::new(&config, &sys).unwrap().into();
    let run = Simulation::new(&opt, &sys, SimulationConfig::new(3))
        .unwrap()
        .run()
        .unwrap();
    let df = run.to_dataframe().unwrap();

    let names: Vec<&str> = df.get_column_names();
    assert_eq!(
        names,
        vec!["t", "u", "y", "phi", "y_violation", "lamb_y", "p", "d"]
    );
}

#[test]
fn csv_export_round_trips_the_header() {
    let sys = cubic_plant();
    let opt = cubic_primal(&sys);
    let run = Simulation::new(&opt, &sys, SimulationConfig::new(4))
        .unwrap()
        .run()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trajectory.csv");
    run.write_csv(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next().unwrap(), "t,u,y,phi,y_violation,d");
    assert_eq!(lines.count(), 5);
}

#[test]
fn summary_serializes_for_report_artifacts() {
    let sys = cubic_plant();
    let opt = cubic_primal(&sys);
    let run = Simulation::new(&opt, &sys, SimulationConfig::new(2))
        .unwrap()
        .run()
        .unwrap();
    let json = serde_json::to_value(run.summary()).unwrap();

    assert_eq!(json["optimizer"], "Primal");
    assert_eq!(json["n_steps"], 2);
    assert_eq!(json["fallback_steps"], 0);
    assert!(json["final_phi"].is_number());
}
