//! Configuration loading tests

use cuebridge_core::{Config, ConfigError, ParamError};

const JSON_CONFIG: &str = r#"{
    "modules": [
        { "id": "tcp-in", "type": "net.tcp.server", "params": { "port": 9000, "framing": "CRLF" } },
        { "id": "udp-out", "type": "net.udp.client", "params": { "host": "127.0.0.1", "port": 7000 } },
        { "id": "ticker", "type": "time.interval" }
    ],
    "routes": [
        {
            "input": "tcp-in",
            "processors": [
                { "type": "string.decode" },
                { "type": "string.filter", "params": { "pattern": "^GO" } },
                { "type": "string.encode" }
            ],
            "output": "udp-out"
        },
        { "input": "ticker", "output": "udp-out" }
    ]
}"#;

const TOML_CONFIG: &str = r#"
[[modules]]
id = "tcp-in"
type = "net.tcp.server"
params = { port = 9000, framing = "SLIP" }

[[routes]]
input = "tcp-in"
output = "tcp-in"

[[routes.processors]]
type = "debug.log"
params = { prefix = "echo" }
"#;

#[test]
fn test_load_json_config() {
    let config = Config::from_json_str(JSON_CONFIG).unwrap();

    assert_eq!(config.modules.len(), 3);
    assert_eq!(config.modules[0].id, "tcp-in");
    assert_eq!(config.modules[0].module_type, "net.tcp.server");
    assert_eq!(config.modules[0].params.get_port("port").unwrap(), 9000);
    assert_eq!(config.modules[0].params.get_str("framing").unwrap(), "CRLF");

    // Missing params deserialize to an empty bag
    assert!(config.modules[2].params.is_empty());

    assert_eq!(config.routes.len(), 2);
    let types: Vec<&str> = config.routes[0]
        .processors
        .iter()
        .map(|p| p.processor_type.as_str())
        .collect();
    assert_eq!(types, vec!["string.decode", "string.filter", "string.encode"]);
    assert!(config.routes[1].processors.is_empty());
}

#[test]
fn test_load_toml_config() {
    let config = Config::from_toml_str(TOML_CONFIG).unwrap();

    assert_eq!(config.modules.len(), 1);
    assert_eq!(config.modules[0].params.get_int("port").unwrap(), 9000);
    assert_eq!(config.routes[0].processors.len(), 1);
    assert_eq!(
        config.routes[0].processors[0].params.get_str("prefix").unwrap(),
        "echo"
    );
}

#[test]
fn test_param_errors_are_distinguishable() {
    let config = Config::from_json_str(JSON_CONFIG).unwrap();
    let params = &config.modules[0].params;

    assert!(params.get_str("host").unwrap_err().is_not_found());
    assert!(matches!(
        params.get_str("port"),
        Err(ParamError::WrongType { .. })
    ));
}

#[test]
fn test_from_path_rejects_unknown_extension() {
    let dir = std::env::temp_dir();
    let path = dir.join("cuebridge-config-test.yaml");
    std::fs::write(&path, "modules: []").unwrap();

    let result = Config::from_path(&path);
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_from_path_json() {
    let dir = std::env::temp_dir();
    let path = dir.join("cuebridge-config-test.json");
    std::fs::write(&path, JSON_CONFIG).unwrap();

    let config = Config::from_path(&path).unwrap();
    assert_eq!(config.modules.len(), 3);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_malformed_json() {
    let result = Config::from_json_str("{ \"modules\": [ { \"id\": 1 } ] }");
    assert!(matches!(result, Err(ConfigError::Json(_))));
}
