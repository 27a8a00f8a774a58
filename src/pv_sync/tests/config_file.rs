use std::io::Write;

use pv_sync::config::{ConfigLoadError, load_config_path};
use secrecy::ExposeSecret;
use tempfile::NamedTempFile;

#[test]
fn loads_full_file_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
timezone = "Europe/Oslo"
lookback_days = 20

[pvoutput]
api_key = "pv-key"
system_id = "4242"
requests_per_hour = 300

[tibber]
token = "tibber-token"
home_id = "home-1"

[goteborg_energi]
username = "user"
password = "pass"
import_pod = "735999100"
export_pod = "735999200"

[eon]
user_id = "19700101-0000"
password = "eon-pass"
installation = "7350001"
"#
    )
    .unwrap();

    let cfg = load_config_path(file.path()).unwrap();
    assert_eq!(cfg.timezone, chrono_tz::Europe::Oslo);
    assert_eq!(cfg.lookback_days, 20);

    let pv = cfg.pvoutput().unwrap();
    assert_eq!(pv.api_key.expose_secret(), "pv-key");
    assert_eq!(pv.requests_per_hour.get(), 300);

    let tibber = cfg.tibber().unwrap();
    assert_eq!(tibber.token.expose_secret(), "tibber-token");
    assert_eq!(tibber.home_id.as_deref(), Some("home-1"));

    let ge = cfg.goteborg_energi().unwrap();
    assert_eq!(ge.username, "user");
    assert_eq!(ge.password.expose_secret(), "pass");
    assert_eq!(ge.import_pod, "735999100");
    assert_eq!(ge.export_pod, "735999200");

    let eon = cfg.eon().unwrap();
    assert_eq!(eon.user_id, "19700101-0000");
    assert_eq!(eon.password.expose_secret(), "eon-pass");
    assert_eq!(eon.installation, "7350001");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigLoadError::Read { .. }), "{err}");
}
