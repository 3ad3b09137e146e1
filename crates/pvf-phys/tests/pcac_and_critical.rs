use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use pvf_core::{MetaValue, Metadata, RngHandle};
use pvf_obs::{Ar1, Obs};
use pvf_phys::{
    collate_critical_masses, consistent_ensemble_metadata, critical_mass_description,
    fit_critical_mass, mpcac, pcac_windows, write_collated_csv,
};
use pvf_read::{read_correlators_hirep, ObsRecord};

const NT: usize = 16;
const MASS: f64 = 0.3;
const QUARK: f64 = 0.05;

const CONFIGS: usize = 20;

fn noise(salt: u64) -> Vec<f64> {
    Ar1 {
        mean: 0.0,
        sigma: 0.005,
        rho: 0.0,
    }
    .history(&mut RngHandle::for_replica(salt, 0), CONFIGS)
}

fn write_meson_log(dir: &Path, masses: &[&str]) -> PathBuf {
    let half = (NT / 2) as f64;
    let (pp_noise, ap_noise) = (noise(1), noise(2));
    let mut log = String::new();
    log.push_str("[SYSTEM][0]Gauge group: SU(2)\n");
    let _ = writeln!(log, "[GEOMETRY_INIT][0]Global size is {NT}x8x8x8");
    for conf in 1..=CONFIGS {
        let _ = writeln!(
            log,
            "[IO][0]Configuration [cnfg/run1_{NT}x8x8x8nc2rADJnf2b2.250000m-1.000000n{conf}] read: [0.5 sec] Plaquette=0.6"
        );
        for mass in masses {
            let pp: Vec<String> = (0..NT)
                .map(|t| {
                    let value = (MASS * (t as f64 - half)).cosh() * (1.0 + pp_noise[conf - 1]);
                    format!("{value:.12e}")
                })
                .collect();
            let ap: Vec<String> = (0..NT)
                .map(|t| {
                    let value = 2.0 * QUARK * (MASS * (t as f64 - half)).sinh() / MASS.sinh()
                        * (1.0 + ap_noise[conf - 1]);
                    format!("{value:.12e}")
                })
                .collect();
            let _ = writeln!(
                log,
                "[MAIN][0]conf #{conf} mass={mass} DEFAULT_SEMWALL TRIPLET g5= {}",
                pp.join(" ")
            );
            let _ = writeln!(
                log,
                "[MAIN][0]conf #{conf} mass={mass} DEFAULT_SEMWALL TRIPLET g5_g0g5_re= {}",
                ap.join(" ")
            );
        }
    }
    let path = dir.join("out_corr_m-1.0");
    fs::write(&path, log).expect("write");
    path
}

#[test]
fn windows_cover_the_first_half_of_the_lattice() {
    let windows = pcac_windows(16);
    assert_eq!(windows.first(), Some(&(4, 5)));
    assert_eq!(windows.last(), Some(&(6, 7)));
    assert_eq!(windows.len(), 6);
    assert!(pcac_windows(8).is_empty());
}

#[test]
fn pcac_mass_is_recovered_from_the_ratio() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_meson_log(dir.path(), &["-1.000000"]);
    let correlators = read_correlators_hirep(&path).expect("read");
    let mut extra = Metadata::new();
    extra.insert("Npv".to_string(), MetaValue::Int(5));
    extra.insert("mpv".to_string(), MetaValue::Float(0.5));
    let result = mpcac(&correlators, extra).expect("mpcac");

    assert_eq!(result.windows.len(), 6);
    assert!((result.mass.value() - QUARK).abs() < 0.05 * QUARK, "{}", result.mass);
    assert!(result.mass.dvalue() > 0.0);
    assert!(result.eff_mass.get(0).is_none());
    assert_eq!(
        result.description["description"].as_str(),
        Some("PCAC mass for ensemble as detailed below.")
    );
    assert_eq!(result.description["Npv"].as_i64(), Some(5));
    assert_eq!(result.description["beta"].as_f64(), Some(2.25));
    for window in &result.windows {
        let n_cut = NT + window.tmax - window.tmin;
        let penalty = 2.0 + 2.0 * n_cut as f64;
        assert!((window.aic - window.fit.chisquare_by_dof - penalty).abs() < 1e-12);
    }
}

#[test]
fn wider_windows_carry_a_larger_cut_penalty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_meson_log(dir.path(), &["-1.000000"]);
    let correlators = read_correlators_hirep(&path).expect("read");
    let result = mpcac(&correlators, Metadata::new()).expect("mpcac");
    let penalty = |tmin: usize, tmax: usize| {
        let window = result
            .windows
            .iter()
            .find(|window| (window.tmin, window.tmax) == (tmin, tmax))
            .expect("window");
        window.aic - window.fit.chisquare_by_dof
    };
    assert!((penalty(4, 7) - penalty(4, 5) - 4.0).abs() < 1e-12);
    assert!((penalty(5, 7) - penalty(6, 7) - 2.0).abs() < 1e-12);
    assert_eq!(penalty(4, 5), 2.0 + 2.0 * (NT + 1) as f64);
}

#[test]
fn several_valence_masses_are_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_meson_log(dir.path(), &["-1.000000", "-0.900000"]);
    let correlators = read_correlators_hirep(&path).expect("read");
    let err = mpcac(&correlators, Metadata::new()).unwrap_err();
    assert_eq!(err.info().code, "valence-mass-count");
    assert!(err.info().message.contains("2 found"));
}

const M0: f64 = -1.35;
const B: f64 = 0.8;
const C: f64 = 1.2;

fn pcac_record(mass: f64, seed: u64, beta: f64) -> ObsRecord {
    let value = B * (mass - M0).powf(C);
    let obs = Ar1 {
        mean: value,
        sigma: 0.02,
        rho: 0.0,
    }
    .observable(seed, &format!("m{seed}"), 1, 400)
    .expect("obs");
    let mut metadata = Metadata::new();
    metadata.insert(
        "valence_masses".to_string(),
        MetaValue::List(vec![MetaValue::Float(mass)]),
    );
    metadata.insert("group_family".to_string(), "SU".into());
    metadata.insert("Nc".to_string(), MetaValue::Int(2));
    metadata.insert("beta".to_string(), MetaValue::Float(beta));
    metadata.insert("valence_representation".to_string(), "adj".into());
    metadata.insert("dynamical_representation".to_string(), "adj".into());
    metadata.insert("Npv".to_string(), MetaValue::Int(5));
    metadata.insert("mpv".to_string(), MetaValue::Float(0.5));
    ObsRecord {
        filename: format!("mpcac/m{seed}.json.gz"),
        metadata,
        obsdata: vec![vec![obs]],
    }
}

fn pcac_records() -> Vec<ObsRecord> {
    // Deliberately unsorted.
    [-0.8, -1.2, -0.6, -1.0, -1.1, -0.7, -0.9]
        .iter()
        .enumerate()
        .map(|(i, mass)| pcac_record(*mass, i as u64 + 1, 2.25))
        .collect()
}

#[test]
fn critical_mass_is_the_zero_of_the_power_law() {
    let records = pcac_records();
    let fit = fit_critical_mass(&records, 0).expect("fit");
    assert_eq!(fit.masses.first(), Some(&-1.2));
    let m0 = fit.critical_mass().expect("m0");
    assert!((m0.value() - M0).abs() < 0.05, "{m0}");
    assert!(m0.dvalue() > 0.0);

    let skipped = fit_critical_mass(&records, 2).expect("fit");
    assert_eq!(skipped.masses.len(), 5);
    assert_eq!(skipped.masses.first(), Some(&-1.0));
}

#[test]
fn critical_mass_description_records_the_fit() {
    let records = pcac_records();
    let metadata = consistent_ensemble_metadata(&records).expect("metadata");
    assert_eq!(metadata["Npv"].as_i64(), Some(5));
    let fit = fit_critical_mass(&records, 0).expect("fit");
    let filenames: Vec<String> = records.iter().map(|r| r.filename.clone()).collect();
    let description = critical_mass_description(&fit.fit, &filenames, metadata);
    assert_eq!(description["dof"].as_i64(), Some(4));
    assert_eq!(description["method"].as_str(), Some("Levenberg-Marquardt"));
    assert_eq!(description["input_filenames"].as_list().map(<[MetaValue]>::len), Some(7));
    assert_eq!(description["beta"].as_f64(), Some(2.25));
}

#[test]
fn inconsistent_ensembles_are_refused() {
    let mut records = pcac_records();
    records.push(pcac_record(-0.5, 99, 2.3));
    let err = consistent_ensemble_metadata(&records).unwrap_err();
    assert_eq!(err.info().code, "inconsistent-metadata");
    assert_eq!(err.info().context.get("key").map(String::as_str), Some("beta"));
}

fn critical_record(npv: Option<i64>, mass: f64, seed: u64) -> ObsRecord {
    let obs: Obs = Ar1 {
        mean: mass,
        sigma: 0.01,
        rho: 0.0,
    }
    .observable(seed, "crit", 1, 100)
    .expect("obs");
    let mut metadata = Metadata::new();
    metadata.insert("Npv".to_string(), npv.into());
    metadata.insert("mpv".to_string(), MetaValue::Float(1.0));
    metadata.insert("beta".to_string(), MetaValue::Float(2.0));
    metadata.insert("chisquare".to_string(), MetaValue::Float(3.0));
    metadata.insert("dof".to_string(), MetaValue::Int(4));
    ObsRecord {
        filename: format!("critical/{seed}.json.gz"),
        metadata,
        obsdata: vec![vec![obs]],
    }
}

#[test]
fn collated_table_has_one_row_per_result() {
    let records = vec![critical_record(Some(5), -1.3, 1), critical_record(None, -1.1, 2)];
    let rows = collate_critical_masses(&records).expect("rows");
    assert_eq!(rows[0].chisquare_per_dof, 0.75);
    let mut buffer = Vec::new();
    write_collated_csv(&rows, &mut buffer).expect("csv");
    let text = String::from_utf8(buffer).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "Npv,mpv,beta,chisquare_per_dof,value_critical_mass,error_critical_mass"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("5,1.0,2.0,0.75,"));
    assert!(lines[2].starts_with(",1.0,2.0,0.75,"));
}
