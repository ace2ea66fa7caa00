use super::*;

use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn env_overrides_defaults_with_app_prefix_winning() {
    let mut settings = Settings::default();
    apply_env(&mut settings, |key| match key {
        "BALLOT_SERVICE_URL" => Some("https://legacy.example/exec".to_string()),
        "APP__SERVICE_URL" => Some("https://script.example/exec".to_string()),
        "APP__REQUEST_TIMEOUT_SECS" => Some("12".to_string()),
        _ => None,
    });

    assert_eq!(
        settings.service_url.as_deref(),
        Some("https://script.example/exec")
    );
    assert_eq!(settings.request_timeout_secs, 12);
    assert_eq!(
        settings.session_database_url,
        Settings::default().session_database_url
    );
}

#[test]
fn unparsable_timeout_keeps_previous_value() {
    let mut settings = Settings::default();
    apply_env(&mut settings, |key| {
        (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
    });
    assert_eq!(settings.request_timeout_secs, 30);
}

#[test]
fn settings_file_values_are_applied() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("ballot_settings_{suffix}.toml"));
    fs::write(
        &path,
        "service_url = \"http://127.0.0.1:9000/exec\"\nrequest_timeout_secs = 5\n",
    )
    .expect("write settings");

    let mut settings = Settings::default();
    apply_file(&mut settings, &path);
    assert_eq!(
        settings.service_url.as_deref(),
        Some("http://127.0.0.1:9000/exec")
    );
    assert_eq!(settings.request_timeout_secs, 5);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn missing_service_url_means_no_endpoint() {
    let settings = Settings {
        service_url: Some("   ".to_string()),
        ..Settings::default()
    };
    assert_eq!(settings.service_endpoint().expect("endpoint"), None);
}

#[test]
fn non_http_service_url_is_rejected() {
    let settings = Settings {
        service_url: Some("ftp://example.org/exec".to_string()),
        ..Settings::default()
    };
    assert!(settings.service_endpoint().is_err());
}

#[test]
fn zero_timeout_is_clamped_to_one_second() {
    let settings = Settings {
        request_timeout_secs: 0,
        ..Settings::default()
    };
    assert_eq!(settings.request_timeout(), Duration::from_secs(1));
}
