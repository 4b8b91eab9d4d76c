use present_pen::mode::HighlightStyle;
use present_pen::settings::PresenterSettings;
use present_pen::settings_store::{load_from_path, save_to_path, SETTINGS_FILE_NAME};
use tempfile::tempdir;

#[test]
fn saved_settings_load_back_sanitized() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

    let mut settings = PresenterSettings::default();
    settings.highlight.style = HighlightStyle::Squircle;
    settings.spotlight.radius = 9_999.0;
    settings.hotkeys.zoom = "Ctrl+Alt+Z".into();
    save_to_path(&path, &settings).unwrap();

    let loaded = load_from_path(&path).unwrap().expect("settings");
    assert_eq!(loaded.highlight.style, HighlightStyle::Squircle);
    assert_eq!(loaded.spotlight.radius, 500.0);
    assert_eq!(loaded.hotkeys.zoom, "Ctrl+Alt+Z");
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);
    std::fs::write(&path, r#"{ "governor_multiplier": 0.05, "timer_minutes": 10 }"#).unwrap();

    let loaded = load_from_path(&path).unwrap().expect("settings");
    assert_eq!(loaded.governor_multiplier, 0.1);
    assert_eq!(loaded.timer_minutes, 10);
    assert_eq!(loaded.tracker_interval_ms, 8);
}
