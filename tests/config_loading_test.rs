//! Settings loading from layered configuration files.

use std::fs;

use assert_matches::assert_matches;
use tempfile::TempDir;
use trace_authz::config::{load_config_from, AppConfigError};
use trace_authz::{
    load_resolver, resolver_from_settings, AuthzError, PlatformDetection, ResolvedUserType, User,
};

fn config_dir(default_toml: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("default.toml"), default_toml).expect("write default.toml");
    dir
}

#[test]
fn missing_directory_uses_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let settings = load_config_from(&dir.path().join("absent")).expect("defaults load");
    assert_eq!(settings.log_level(), "info");
    assert!(!settings.log_json);
    assert_eq!(settings.platform_detection(), PlatformDetection::Explicit);
}

#[test]
fn file_enables_legacy_detection() {
    let dir = config_dir(
        r#"
            log_level = "debug"
            legacy_username_detection = true
            legacy_platform_usernames = ["root_admin"]
        "#,
    );
    let settings = load_config_from(dir.path()).expect("settings load");
    assert_eq!(settings.log_level(), "debug");

    let resolver = resolver_from_settings(&settings);
    let user = User {
        id: "1".into(),
        username: Some("root_admin".into()),
        ..Default::default()
    };
    assert_eq!(
        resolver.get_user_type(Some(&user)),
        Some(ResolvedUserType::PlatformAdmin)
    );
    assert_eq!(resolver.get_user_role(Some(&user)), "platform_super_admin");
}

#[test]
fn invalid_log_level_is_rejected() {
    let dir = config_dir(r#"log_level = "chatty""#);
    assert_matches!(load_config_from(dir.path()), Err(AppConfigError::Validation(_)));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = config_dir(r#"jwt_secret = "not-ours""#);
    assert_matches!(load_config_from(dir.path()), Err(AppConfigError::Load(_)));
}

#[test]
fn load_resolver_wraps_settings_errors() {
    let dir = config_dir(r#"log_level = "chatty""#);
    assert_matches!(
        load_resolver(dir.path()),
        Err(AuthzError::Config(AppConfigError::Validation(_)))
    );
}

#[test]
fn production_profile_keeps_legacy_detection() {
    let dir = config_dir(
        r#"
            environment = "production"
            legacy_username_detection = true
        "#,
    );
    let (settings, resolver) = load_resolver(dir.path()).expect("settings load");
    assert!(settings.is_production());
    assert_eq!(resolver.detection(), &PlatformDetection::legacy_defaults());

    let admin = User {
        id: "7".into(),
        username: Some("super_admin".into()),
        ..Default::default()
    };
    assert!(resolver.is_platform_admin(Some(&admin)));
}
