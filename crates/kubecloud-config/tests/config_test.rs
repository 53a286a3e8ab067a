#![allow(clippy::unwrap_used)]
// Layering of defaults, TOML file and environment.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use kubecloud_config::{Config, ConfigError, load_config_from, save_config_to};
use pretty_assertions::assert_eq;

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
        assert_eq!(cfg, Config::default());
        Ok(())
    });
}

#[test]
fn file_overrides_defaults_per_key() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                debug_logging = true

                [api]
                base_url = "https://kube.example.com/api"

                [mock]
                enabled = false
            "#,
        )?;

        let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
        assert!(cfg.debug_logging);
        assert_eq!(cfg.api.base_url, "https://kube.example.com/api");
        assert_eq!(cfg.api.timeout_ms, 10_000);
        assert!(!cfg.mock.enabled);
        assert_eq!(cfg.mock.delay_ms, 1000);
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[mock]\ndelay_ms = 250\nerror_rate = 0.5\n")?;
        jail.set_env("KUBECLOUD_MOCK__DELAY_MS", "0");
        jail.set_env("KUBECLOUD_MOCK__ERROR_RATE", "0");
        jail.set_env("KUBECLOUD_LIFECYCLE__START_DELAY_MS", "10");
        jail.set_env("KUBECLOUD_STORAGE_PATH", "/tmp/kc/session.json");

        let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
        assert_eq!(cfg.mock.delay_ms, 0);
        assert!(cfg.mock.error_rate.abs() < f64::EPSILON);
        assert_eq!(cfg.lifecycle.start_delay_ms, 10);
        assert_eq!(cfg.lifecycle.stop_delay_ms, 2000);

        let app = cfg.to_app_config().map_err(|e| e.to_string())?;
        assert_eq!(app.mock.delay, Duration::ZERO);
        assert_eq!(app.lifecycle.start_delay, Duration::from_millis(10));
        assert_eq!(
            app.storage_path.as_deref(),
            Some(Path::new("/tmp/kc/session.json"))
        );
        Ok(())
    });
}

#[test]
fn malformed_file_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[mock]\ndelay_ms = \"soon\"\n")?;
        let err = load_config_from(Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.mock.error_rate = 0.25;
    cfg.notifications.error_duration_ms = 12_000;
    save_config_to(&cfg, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[notifications]"));
    assert!(!text.contains("storage_path"));

    let loaded: Config = toml::from_str(&text).unwrap();
    assert_eq!(loaded, cfg);
}
