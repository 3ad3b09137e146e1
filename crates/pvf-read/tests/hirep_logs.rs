use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use pvf_core::{MetaValue, Metadata};
use pvf_read::{
    read_correlators_hirep, read_flows, read_hmc_log, read_plaquette_from_flows, FlowCache,
    HmcOpts, Operator, ReaderKind,
};

const TIMES: [f64; 3] = [0.0, 0.02, 0.04];

fn config_line(run: &str, index: usize, plaquette: f64) -> String {
    format!(
        "[IO][0]Configuration [cnfg/{run}_8x8x8x8nc2rADJnf2b2.250000m-1.000000n{index}] read: [0.5 sec] Plaquette={plaquette:.8}\n"
    )
}

fn flow_line(count: usize, t: f64, e: f64, esym: f64, charge: f64) -> String {
    format!(
        "[WILSONFLOW][0]WF (ncnfg,t,E,t2*E,Esym,t2*Esym,TC) = {count} {t:.6} {e:.10} {:.10} {esym:.10} {:.10} {charge:.6}\n",
        t * t * e,
        t * t * esym
    )
}

fn e_plaq(index: usize, t: usize) -> f64 {
    1.0 + 0.01 * (index % 3) as f64 - 0.2 * t as f64
}

fn e_sym(index: usize, t: usize) -> f64 {
    0.9 + 0.02 * (index % 4) as f64 - 0.15 * t as f64
}

fn plaquette(run: usize, index: usize) -> f64 {
    0.55 + 0.001 * ((index * 7 + run) % 5) as f64
}

fn write_flow_log(dir: &Path, with_incomplete: bool) -> PathBuf {
    let mut log = String::new();
    log.push_str("[SYSTEM][0]Gauge group: SU(2)\n");
    log.push_str("[GEOMETRY_INIT][0]Global size is 8x8x8x8\n");
    let mut count = 0;
    for (r, run) in ["runA", "runB"].iter().enumerate() {
        for index in (10..70).step_by(10) {
            count += 1;
            log.push_str(&config_line(run, index, plaquette(r, index)));
            for (t, time) in TIMES.iter().enumerate() {
                log.push_str(&flow_line(count, *time, e_plaq(index, t), e_sym(index, t), 0.1));
            }
        }
    }
    if with_incomplete {
        log.push_str(&config_line("runA", 70, 0.5));
        log.push_str(&flow_line(count + 1, 0.0, 1.0, 1.0, 0.0));
    }
    let path = dir.join("out_wflow_0pv_beta2.25_mpv1.0_L8");
    fs::write(&path, log).expect("write log");
    path
}

#[test]
fn flows_are_grouped_into_replicas_and_incomplete_flows_dropped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_flow_log(dir.path(), true);
    let flows = read_flows(&path, ReaderKind::Hirep, &Metadata::new())
        .expect("read")
        .expect("flows");

    assert_eq!(flows.configurations.len(), 12);
    assert_eq!(flows.times.len(), 3);
    assert!((flows.h - 0.02).abs() < 1e-12);
    assert_eq!(flows.metadata["Nc"].as_i64(), Some(2));
    assert_eq!(flows.metadata["NX"].as_i64(), Some(8));
    assert_eq!(flows.metadata["beta"].as_f64(), Some(2.25));
    assert_eq!(flows.metadata["Npv"].as_i64(), Some(0));
    assert_eq!(flows.metadata["reader"].as_str(), Some("hirep"));
    assert_eq!(flows.runs(), vec!["runA", "runB"]);

    let energy = flows.energy_density(Operator::Sym).expect("energy");
    assert_eq!(energy.len(), 3);
    let expected: f64 = (10..70)
        .step_by(10)
        .map(|index| e_sym(index, 1))
        .sum::<f64>()
        / 6.0;
    let obs = energy.require(1).expect("t=1");
    assert!((obs.value() - expected).abs() < 1e-9);
    assert_eq!(obs.names().count(), 2);

    let charge = flows.topological_charge().expect("charge");
    assert!((charge.require(2).expect("t=2").value() - 0.1).abs() < 1e-12);
}

#[test]
fn plaquette_matches_the_configuration_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_flow_log(dir.path(), false);
    let from_lines = read_plaquette_from_flows(&path).expect("plaquette");
    let expected: f64 = (0..2)
        .flat_map(|run| (10..70).step_by(10).map(move |index| plaquette(run, index)))
        .sum::<f64>()
        / 12.0;
    assert!((from_lines.value() - expected).abs() < 1e-7);

    let flows = read_flows(&path, ReaderKind::Hirep, &Metadata::new())
        .expect("read")
        .expect("flows");
    assert_eq!(flows.plaquette().expect("plaquette"), from_lines);
}

#[test]
fn extra_metadata_overrides_only_non_null_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_flow_log(dir.path(), false);
    let mut extra = Metadata::new();
    extra.insert("Nc".to_string(), MetaValue::Int(3));
    extra.insert("beta".to_string(), MetaValue::Null);
    let flows = read_flows(&path, ReaderKind::Hirep, &extra)
        .expect("read")
        .expect("flows");
    assert_eq!(flows.metadata["Nc"].as_i64(), Some(3));
    assert_eq!(flows.metadata["beta"].as_f64(), Some(2.25));
}

#[test]
fn logs_without_configurations_yield_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out_wflow_0pv_beta2.25_mpv1.0_L8");
    fs::write(&path, "[SYSTEM][0]Gauge group: SU(2)\n").expect("write");
    assert!(read_flows(&path, ReaderKind::Hirep, &Metadata::new())
        .expect("read")
        .is_none());
}

#[test]
fn cached_reads_return_the_same_flows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_flow_log(dir.path(), false);
    let cache = FlowCache::new(dir.path().join("cache"));
    let first = cache
        .read_flows(&path, ReaderKind::Hirep, &Metadata::new())
        .expect("first");
    let entries = fs::read_dir(dir.path().join("cache")).expect("cache dir").count();
    assert_eq!(entries, 1);
    let second = cache
        .read_flows(&path, ReaderKind::Hirep, &Metadata::new())
        .expect("second");
    assert_eq!(first, second);

    let mut extra = Metadata::new();
    extra.insert("Nc".to_string(), MetaValue::Int(3));
    assert_ne!(
        cache.key(&path, ReaderKind::Hirep, &extra).expect("key"),
        cache.key(&path, ReaderKind::Hirep, &Metadata::new()).expect("key")
    );
}

fn write_hmc_log(dir: &Path, name: &str, trajectories: &[usize], accepted: bool) -> PathBuf {
    let mut log = String::new();
    log.push_str("[MD_INT][10]MD parameters: level=0 tlen=1.000000 nsteps=20\n");
    for trajectory in trajectories {
        let _ = writeln!(log, "[MAIN][0]Trajectory #{trajectory}...");
        let verdict = if accepted { "accepted." } else { "rejected." };
        let _ = writeln!(log, "[HMC][10]Configuration {verdict}");
        let _ = writeln!(
            log,
            "[MAIN][0]Plaquette: {:.8}",
            0.6 + 0.001 * ((trajectory * 13) % 7) as f64
        );
    }
    let path = dir.join(name);
    fs::write(&path, log).expect("write log");
    path
}

#[test]
fn hmc_streams_drop_thermalisation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let trajectories: Vec<usize> = (1..=40).collect();
    let path = write_hmc_log(dir.path(), "out_hmc_a", &trajectories, true);
    let opts = HmcOpts {
        therm: 10,
        ..HmcOpts::default()
    };
    let stream = read_hmc_log(&path, &opts).expect("read").expect("stream");
    assert_eq!(stream.plaquette.n_samples(), 30);
    assert_eq!(stream.tlen, Some(1.0));
    assert_eq!(stream.nsteps, Some(20));
    assert_eq!(stream.acceptance, 1.0);
}

#[test]
fn hmc_streams_failing_cuts_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let short = write_hmc_log(dir.path(), "short", &(1..=20).collect::<Vec<_>>(), true);
    assert!(read_hmc_log(&short, &HmcOpts::default()).expect("read").is_none());

    let rejected = write_hmc_log(dir.path(), "rejected", &(1..=40).collect::<Vec<_>>(), false);
    let opts = HmcOpts {
        therm: 0,
        ..HmcOpts::default()
    };
    assert!(read_hmc_log(&rejected, &opts).expect("read").is_none());

    // Default thermalisation leaves nothing of a 40-trajectory stream.
    let long = write_hmc_log(dir.path(), "long", &(1..=40).collect::<Vec<_>>(), true);
    assert!(read_hmc_log(&long, &HmcOpts::default()).expect("read").is_none());
}

#[test]
fn hmc_restart_truncates_the_stream() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut trajectories: Vec<usize> = (1..=30).collect();
    trajectories.extend(5..=15);
    let path = write_hmc_log(dir.path(), "restarted", &trajectories, true);
    let opts = HmcOpts {
        therm: 0,
        ..HmcOpts::default()
    };
    let stream = read_hmc_log(&path, &opts).expect("read").expect("stream");
    assert_eq!(stream.plaquette.n_samples(), 30);
}

#[test]
fn inconsistent_md_parameters_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("inconsistent");
    fs::write(
        &path,
        "[MD_INT][10]MD parameters: level=0 tlen=1.000000 nsteps=20\n\
         [MD_INT][10]MD parameters: level=0 tlen=2.000000 nsteps=20\n",
    )
    .expect("write");
    let err = read_hmc_log(&path, &HmcOpts::default()).unwrap_err();
    assert_eq!(err.info().code, "inconsistent-md-parameters");
}

#[test]
fn meson_correlators_carry_ensemble_metadata() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut log = String::new();
    log.push_str("[SYSTEM][0]Gauge group: SU(2)\n");
    log.push_str("[GEOMETRY_INIT][0]Global size is 4x4x4x4\n");
    for conf in (100..700).step_by(100) {
        log.push_str(&config_line("run1", conf, 0.6));
        let scale = 1.0 + 0.01 * (conf / 100) as f64;
        let _ = writeln!(
            log,
            "[MAIN][0]conf #{conf} mass=-1.000000 DEFAULT_SEMWALL TRIPLET g5= {} {} {} {}",
            2.0 * scale,
            1.0 * scale,
            0.5 * scale,
            1.0 * scale
        );
        let _ = writeln!(
            log,
            "[MAIN][0]conf #{conf} mass=-1.000000 DEFAULT_SEMWALL TRIPLET g5_g0g5_re= 0.0 0.1 0.0 -0.1"
        );
    }
    let path = dir.path().join("out_corr");
    fs::write(&path, log).expect("write");

    let correlators = read_correlators_hirep(&path).expect("read");
    assert_eq!(correlators.nt, 4);
    assert_eq!(correlators.valence_masses(), vec![-1.0]);
    assert_eq!(correlators.metadata["beta"].as_f64(), Some(2.25));
    assert_eq!(correlators.metadata["Nc"].as_i64(), Some(2));
    assert_eq!(correlators.metadata["group_family"].as_str(), Some("SU"));
    assert_eq!(
        correlators.metadata["valence_representation"].as_str(),
        Some("adj")
    );
    assert_eq!(correlators.keys().len(), 2);

    let pp = correlators.correlator("g5").expect("g5");
    assert_eq!(pp.len(), 4);
    let expected = 2.0 * (1.0 + 0.035);
    assert!((pp.require(0).expect("t=0").value() - expected).abs() < 1e-12);
    assert_eq!(correlators.correlator("g1").unwrap_err().info().code, "missing-channel");
}
