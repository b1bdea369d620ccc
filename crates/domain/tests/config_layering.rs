use llmfs_domain::config::{ConfigStore, ModelParameters, MountConfig};

#[test]
fn defaults_without_config_file() {
    let cfg = MountConfig::default();
    assert!(cfg.api_key.is_empty());
    assert!(cfg.search_endpoint.starts_with("ipc://"));
    assert!(cfg.global_params.is_empty());
}

#[test]
fn full_config_round_trip() {
    let toml_str = r#"
default_model = "gpt-x"
api_key = "sk-test"
base_url = "http://localhost:1234/v1"

[semantic_search]
service_url = "tcp://127.0.0.1:5555"

[default_config]
temperature = 0.4
system_prompt = "be terse"
"#;
    let cfg = MountConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(cfg.default_model, "gpt-x");
    assert_eq!(cfg.base_url, "http://localhost:1234/v1/");
    assert_eq!(cfg.search_endpoint, "tcp://127.0.0.1:5555");
    assert_eq!(cfg.global_params.temperature, Some(0.4));
    assert_eq!(cfg.global_params.system_prompt.as_deref(), Some("be terse"));
}

#[test]
fn default_alias_resolves_through_store() {
    let cfg = MountConfig::from_toml_str("default_model = \"m0\"").unwrap();
    let store = ConfigStore::new(cfg);
    assert_eq!(store.resolve_model("default"), "m0");
    assert_eq!(store.resolve_model("m1"), "m1");
}

#[test]
fn model_layer_shadows_global_layer() {
    let cfg = MountConfig::from_toml_str(
        "[default_config]\ntemperature = 0.2\nsystem_prompt = \"g\"\n",
    )
    .unwrap();
    let store = ConfigStore::new(cfg);

    let written = ModelParameters::parse("temperature = 1.8").unwrap();
    store.update_model_params("m0", &written);

    let effective = store.model_params("m0");
    assert_eq!(effective.temperature, Some(1.8));
    assert_eq!(effective.system_prompt.as_deref(), Some("g"));
}
