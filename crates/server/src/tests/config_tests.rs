use super::*;

#[test]
fn default_settings_pass_validation() {
    let settings = Settings::default();
    validate_settings(&settings).expect("defaults are valid");
    assert_eq!(settings.alarm_threshold, 30.0);
    assert_eq!(settings.min_reading, -50.0);
    assert_eq!(settings.max_reading, 100.0);
}

#[test]
fn file_settings_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
bind_addr = "0.0.0.0:9000"
alarm_threshold = 28.5
min_reading = -10.0
"#,
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.alarm_threshold, 28.5);
    assert_eq!(settings.min_reading, -10.0);
    // Untouched keys keep their defaults.
    assert_eq!(settings.max_reading, 100.0);
}

#[test]
fn malformed_file_settings_are_ignored() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "bind_addr = [not toml");
    assert_eq!(settings.server_bind, "127.0.0.1:8080");
}

#[test]
fn inverted_limits_fail_validation() {
    let settings = Settings {
        min_reading: 50.0,
        max_reading: -50.0,
        ..Settings::default()
    };
    assert!(validate_settings(&settings).is_err());
}

#[test]
fn non_finite_threshold_fails_validation() {
    let settings = Settings {
        alarm_threshold: f64::NAN,
        ..Settings::default()
    };
    assert!(validate_settings(&settings).is_err());
}
