use std::io::Write;
use std::path::Path;

use probewatch::config;

#[test]
fn loads_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[[measurements]]\nid = \"1001\"\ntimeout_seconds = 30\n"
    )
    .unwrap();

    let cfg = config::load(file.path()).unwrap();
    assert_eq!(cfg.measurement_ids(), vec!["1001"]);
    assert_eq!(cfg.measurements[0].timeout_seconds, Some(30));
}

#[test]
fn missing_file_is_an_error() {
    let err = config::load(Path::new("/nonexistent/probewatch.toml")).unwrap_err();
    assert!(err.to_string().contains("could not load config"));
}
