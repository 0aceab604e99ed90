// Provider construction and validation
//
// Verifies that the factory fails fast on missing credentials and absent
// provider names, and that environment overrides overlay the persisted
// config in the documented order.

use cmdsage::config::{AppConfig, ProviderConfig};
use cmdsage::providers::factory::{create_from_app_config, create_with_env, EnvOverrides};
use cmdsage::providers::{ProviderError, ProviderKind};

fn env_with_keys() -> EnvOverrides {
    EnvOverrides {
        openai_api_key: Some("test-openai".to_string()),
        anthropic_api_key: Some("test-anthropic".to_string()),
        openrouter_api_key: Some("test-openrouter".to_string()),
        ..Default::default()
    }
}

#[test]
fn missing_credential_fails_before_construction() {
    let env = EnvOverrides::default();
    for kind in [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::OpenRouter,
    ] {
        let config = ProviderConfig::default_for(kind);
        let err = create_with_env(&config, &env).err().unwrap();
        match err {
            ProviderError::Configuration(message) => {
                // The message names the variable the user must set
                assert!(message.contains("_API_KEY"), "{kind}: {message}");
            }
            other => panic!("{kind}: expected Configuration, got {other:?}"),
        }
    }
}

#[test]
fn every_kind_constructs_with_credentials() {
    let env = env_with_keys();
    for kind in ProviderKind::all() {
        let config = ProviderConfig::default_for(kind);
        let client = create_with_env(&config, &env).unwrap();
        assert_eq!(client.provider_kind(), kind);
        assert_eq!(client.model_name(), config.model());
    }
}

#[test]
fn unknown_backend_name_rejected_at_parse_boundary() {
    let err = "mystery".parse::<ProviderKind>().unwrap_err();
    assert!(matches!(err, ProviderError::UnknownProviderKind(name) if name == "mystery"));
}

#[test]
fn missing_current_provider_is_explicit_failure() {
    let mut app = AppConfig::default();
    app.current_provider = "team-openai".to_string();

    let err = create_from_app_config(&app, &env_with_keys()).err().unwrap();
    assert!(
        matches!(err, ProviderError::ProviderNotConfigured(name) if name == "team-openai")
    );
}

#[test]
fn current_provider_resolves_through_table() {
    let mut app = AppConfig::default();
    app.providers.insert(
        "work".to_string(),
        ProviderConfig::default_for(ProviderKind::OpenAi),
    );
    app.current_provider = "work".to_string();

    let client = create_from_app_config(&app, &env_with_keys()).unwrap();
    assert_eq!(client.provider_kind(), ProviderKind::OpenAi);
}

#[test]
fn environment_model_beats_persisted_config() {
    let config = ProviderConfig::Local {
        host_url: "http://localhost:11434".to_string(),
        model: "from-config".to_string(),
        timeout_ms: 60_000,
    };
    let env = EnvOverrides {
        model: Some("from-env".to_string()),
        ..Default::default()
    };

    let client = create_with_env(&config, &env).unwrap();
    assert_eq!(client.model_name(), "from-env");
}

#[test]
fn environment_host_applies_to_local_only() {
    let env = EnvOverrides {
        host: Some("http://build-box:11434".to_string()),
        openai_api_key: Some("test-key".to_string()),
        ..Default::default()
    };

    let local = create_with_env(&ProviderConfig::default_for(ProviderKind::Local), &env).unwrap();
    assert_eq!(
        local.get_config().host_url(),
        Some("http://build-box:11434")
    );

    let cloud = create_with_env(&ProviderConfig::default_for(ProviderKind::OpenAi), &env).unwrap();
    assert_eq!(cloud.get_config().host_url(), None);
}

#[test]
fn kind_is_immutable_through_updates() {
    let env = env_with_keys();
    for kind in ProviderKind::all() {
        let config = ProviderConfig::default_for(kind);
        let mut client = create_with_env(&config, &env).unwrap();
        client.update_config(&cmdsage::config::ConfigUpdate::model("something-else"));
        assert_eq!(client.provider_kind(), kind);
        assert_eq!(client.model_name(), "something-else");
    }
}
