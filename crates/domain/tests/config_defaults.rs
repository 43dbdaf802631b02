use sky_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8710
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_ttl_is_24_hours() {
    let config = Config::default();
    assert_eq!(config.sessions.ttl_hours, 24);
    assert_eq!(config.sessions.sweep_interval_secs, 3600);
}

#[test]
fn default_config_validates_cleanly() {
    let config = Config::default();
    assert!(config.validate().is_empty());
}

#[test]
fn zero_ttl_is_a_validation_error() {
    let toml_str = r#"
[sessions]
ttl_hours = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("ttl_hours")));
}

#[test]
fn partial_llm_section_keeps_other_defaults() {
    let toml_str = r#"
[llm]
model = "gpt-4o"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    assert!(config.llm.base_url.contains("api.openai.com"));
}
