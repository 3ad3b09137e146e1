use std::collections::BTreeMap;

use pvf_core::MetaValue;
use pvf_obs::{dump_dict, dump_obs, load_dict, load_obs, Ar1, Obs};
use tempfile::tempdir;

fn sample_obs() -> Obs {
    Ar1 {
        mean: 0.6,
        sigma: 0.05,
        rho: 0.4,
    }
    .observable(9, "L16", 2, 30)
    .expect("observable")
}

#[test]
fn compressed_lists_restore_values_and_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("result.json.gz");
    let a = sample_obs();
    let b = a.powi(2) + 1.0;

    dump_obs(&path, &[vec![a.clone(), b.clone()]], "plaquette".into()).expect("dump");
    let file = load_obs(&path).expect("load");

    assert_eq!(file.description, MetaValue::Text("plaquette".into()));
    assert!(file.provenance.program.starts_with("pvflow"));
    assert_eq!(file.provenance.version, "1.1");
    let restored = &file.obsdata[0];
    assert_eq!(restored.len(), 2);
    for (original, loaded) in [a, b].iter().zip(restored) {
        assert!((original.value() - loaded.value()).abs() < 1e-12);
        assert!((original.dvalue() - loaded.dvalue()).abs() < 1e-10);
    }
}

#[test]
fn plain_files_hold_constants() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("constant.json");
    dump_obs(&path, &[vec![Obs::constant(2.5)]], MetaValue::Null).expect("dump");
    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.contains("\"type\":\"Obs\""));
    let file = load_obs(&path).expect("load");
    assert!(file.obsdata[0][0].is_constant());
    assert_eq!(file.obsdata[0][0].value(), 2.5);
}

#[test]
fn dictionaries_round_trip_with_their_description() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("fit.json.gz");
    let obs = sample_obs();
    let mut entries = BTreeMap::new();
    entries.insert("gGF^2".to_string(), vec![obs.clone(), &obs * 2.0]);
    entries.insert("betaGF".to_string(), vec![-&obs]);

    let mut description = BTreeMap::new();
    description.insert("beta".to_string(), MetaValue::Float(2.25));
    dump_dict(&path, &entries, description.into()).expect("dump");

    let dict = load_dict(&path).expect("load");
    assert_eq!(dict.entries.len(), 2);
    assert_eq!(dict.entries["gGF^2"].len(), 2);
    assert!((dict.entries["betaGF"][0].value() + obs.value()).abs() < 1e-12);
    let beta = dict.description.as_map().expect("map")["beta"].as_f64();
    assert_eq!(beta, Some(2.25));
}

#[test]
fn missing_files_report_the_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let err = load_obs(&path).unwrap_err();
    assert_eq!(err.info().code, "read-failed");
    assert!(err.info().context["path"].ends_with("absent.json"));
}
