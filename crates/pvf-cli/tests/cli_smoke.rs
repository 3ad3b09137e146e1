use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pvf_core::{MetaValue, Metadata};
use pvf_obs::{dump_obs, Ar1};

fn pvf(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pvf"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run pvf")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

fn write_pcac_mass(dir: &Path, mass: f64, seed: u64) -> PathBuf {
    let value = 0.8 * (mass + 1.35_f64).powf(1.2);
    let obs = Ar1 {
        mean: value,
        sigma: 0.02,
        rho: 0.0,
    }
    .observable(seed, &format!("m{seed}"), 1, 400)
    .expect("obs");
    let mut description = Metadata::new();
    description.insert(
        "valence_masses".to_string(),
        MetaValue::List(vec![MetaValue::Float(mass)]),
    );
    description.insert("group_family".to_string(), "SU".into());
    description.insert("Nc".to_string(), MetaValue::Int(2));
    description.insert("beta".to_string(), MetaValue::Float(2.25));
    description.insert("valence_representation".to_string(), "adj".into());
    description.insert("dynamical_representation".to_string(), "adj".into());
    description.insert("Npv".to_string(), MetaValue::Int(5));
    description.insert("mpv".to_string(), MetaValue::Float(0.5));
    let path = dir.join(format!("mpcac_{seed}.json.gz"));
    dump_obs(&path, &[vec![obs]], description.into()).expect("dump");
    path
}

#[test]
fn critical_mass_results_collate_to_csv() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs: Vec<PathBuf> = [-0.8, -1.2, -0.6, -1.0, -1.1, -0.7, -0.9]
        .iter()
        .enumerate()
        .map(|(i, mass)| write_pcac_mass(dir.path(), *mass, i as u64 + 1))
        .collect();
    let critical = dir.path().join("critical.json.gz");

    let mut args = vec!["critical-mf"];
    args.extend(inputs.iter().map(|path| path_arg(path)));
    args.extend(["--output-filename", path_arg(&critical), "--plot-filename", "/dev/null"]);
    let output = pvf(&args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(critical.exists());

    let output = pvf(&["collate-critical-mf", path_arg(&critical)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let table = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(
        lines[0],
        "Npv,mpv,beta,chisquare_per_dof,value_critical_mass,error_critical_mass"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("5,0.5,2.25,"), "{}", lines[1]);
}

#[test]
fn critical_mass_is_printed_without_an_output_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs: Vec<PathBuf> = [-1.2, -1.1, -1.0, -0.8, -0.7, -0.6]
        .iter()
        .enumerate()
        .map(|(i, mass)| write_pcac_mass(dir.path(), *mass, i as u64 + 20))
        .collect();
    let mut args = vec!["critical-mf"];
    args.extend(inputs.iter().map(|path| path_arg(path)));
    let output = pvf(&args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let printed = String::from_utf8(output.stdout).expect("utf8");
    let value: f64 = printed
        .trim()
        .split('(')
        .next()
        .and_then(|value| value.parse().ok())
        .expect("value(error)");
    assert!((value + 1.35).abs() < 0.2, "{printed}");
}

#[test]
fn empty_phase_scan_reports_no_points() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scan = dir.path().join("scan.yaml");
    fs::write(
        &scan,
        format!(
            "raw_data: {}\nbetas: [2.0]\nmasses: [-0.5]\npv_specs:\n  - npv: 0\n",
            dir.path().display()
        ),
    )
    .expect("write scan");
    let plots = dir.path().join("plots");
    let output = pvf(&["phasediagram", "--scan", path_arg(&scan), "--plot-dir", path_arg(&plots)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8(output.stdout).expect("utf8").trim(),
        "0 phase diagram points found"
    );
    assert!(!plots.exists());
}

#[test]
fn missing_inputs_fail() {
    let output = pvf(&["mpcac", "does/not/exist.log"]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());

    let output = pvf(&["fit-beta"]);
    assert!(!output.status.success());
}

#[test]
fn unsupported_plot_formats_are_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs: Vec<PathBuf> = [-1.2, -1.0, -0.8, -0.6, -0.4]
        .iter()
        .enumerate()
        .map(|(i, mass)| write_pcac_mass(dir.path(), *mass, i as u64 + 40))
        .collect();
    let png = dir.path().join("critical.png");
    let mut args = vec!["critical-mf"];
    args.extend(inputs.iter().map(|path| path_arg(path)));
    args.extend(["--plot-filename", path_arg(&png)]);
    let output = pvf(&args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported-plot-format"));
}
