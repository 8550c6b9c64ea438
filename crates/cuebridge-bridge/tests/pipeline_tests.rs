//! Routing through the built-in processors and modules
//!
//! Builds a router from JSON configuration with the built-in registrations
//! plus the mock module type, the way the host binary does.

use cuebridge_bridge::register_builtins;
use cuebridge_core::{Config, Payload, RoutingErrorKind};
use cuebridge_router::{ModuleRegistry, ProcessorRegistry, Router};
use cuebridge_test_utils::{
    find_available_port, register_test_processors, MockHub, TestRouter, DEFAULT_TIMEOUT,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn registries(hub: &MockHub) -> (ModuleRegistry, ProcessorRegistry) {
    let modules = ModuleRegistry::new();
    let processors = ProcessorRegistry::new();
    register_builtins(&modules, &processors);
    modules.register(hub.registration());
    register_test_processors(&processors);
    (modules, processors)
}

fn build(config: serde_json::Value) -> (Router, MockHub) {
    let hub = MockHub::new();
    let (modules, processors) = registries(&hub);
    let config = Config::from_json_str(&config.to_string()).unwrap();
    let (router, module_errors, route_errors) = Router::new(&config, &modules, &processors);
    assert!(module_errors.is_empty(), "{:?}", module_errors);
    assert!(route_errors.is_empty(), "{:?}", route_errors);
    (router, hub)
}

#[tokio::test]
async fn test_fader_pipeline() {
    let (router, hub) = build(json!({
        "modules": [
            { "id": "console", "type": "test.mock" },
            { "id": "dimmer", "type": "test.mock" },
            { "id": "state", "type": "test.mock" }
        ],
        "routes": [
            {
                "input": "console",
                "processors": [
                    { "type": "string.decode" },
                    { "type": "int.parse" },
                    { "type": "float.scale",
                      "params": { "in_min": 0, "in_max": 100, "out_min": 0, "out_max": 255 } },
                    { "type": "float.clamp", "params": { "min": 0, "max": 255 } }
                ],
                "output": "dimmer"
            },
            {
                "input": "console",
                "processors": [
                    { "type": "string.decode" },
                    { "type": "int.parse" },
                    { "type": "expr.evaluate",
                      "params": { "expression": "if(value >= 100, \"full\", \"partial\")" } }
                ],
                "output": "state"
            }
        ]
    }));

    for input in ["50", "150"] {
        let outcome = router
            .handle_input("console", Payload::from(input.as_bytes().to_vec()))
            .await;
        assert!(outcome.is_ok(), "{:?}", outcome.errors);
    }

    let outcome = router
        .handle_input("console", Payload::from(b"not a number".to_vec()))
        .await;
    assert!(outcome.matched);
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome
        .errors
        .iter()
        .all(|e| matches!(e.kind, RoutingErrorKind::Process(_))));

    assert_eq!(
        hub.module("dimmer").unwrap().outputs.payloads(),
        vec![Payload::Float(127.5), Payload::Float(255.0)]
    );
    assert_eq!(
        hub.module("state").unwrap().outputs.payloads(),
        vec![Payload::from("partial"), Payload::from("full")]
    );
}

#[tokio::test]
async fn test_filter_and_template_pipeline() {
    let (router, hub) = build(json!({
        "modules": [
            { "id": "in", "type": "test.mock" },
            { "id": "out", "type": "test.mock" },
            { "id": "audit", "type": "test.mock" }
        ],
        "routes": [
            {
                "input": "in",
                "processors": [
                    { "type": "string.filter", "params": { "pattern": "^GO" } },
                    { "type": "string.template", "params": { "template": "/cue/{}" } },
                    { "type": "string.encode" }
                ],
                "output": "out"
            },
            {
                "input": "in",
                "processors": [{ "type": "debug.log", "params": { "prefix": "[audit]" } }],
                "output": "audit"
            }
        ]
    }));

    for input in ["GO 1", "STOP", "GO 2"] {
        let outcome = router.handle_input("in", Payload::from(input)).await;
        assert!(outcome.matched);
        assert!(outcome.is_ok());
    }

    assert_eq!(
        hub.module("out").unwrap().outputs.payloads(),
        vec![
            Payload::from(b"/cue/GO 1".to_vec()),
            Payload::from(b"/cue/GO 2".to_vec()),
        ]
    );
    assert_eq!(hub.module("audit").unwrap().outputs.count(), 3);
}

#[tokio::test]
async fn test_json_round_trip_pipeline() {
    let (router, hub) = build(json!({
        "modules": [
            { "id": "in", "type": "test.mock" },
            { "id": "out", "type": "test.mock" }
        ],
        "routes": [{
            "input": "in",
            "processors": [{ "type": "json.decode" }, { "type": "json.encode" }],
            "output": "out"
        }]
    }));

    router
        .handle_input("in", Payload::from(r#"{ "cue" : 7 }"#))
        .await;

    assert_eq!(
        hub.module("out").unwrap().outputs.payloads(),
        vec![Payload::from(r#"{"cue":7}"#)]
    );
}

#[test]
fn test_bad_builtin_params_reject_route() {
    let hub = MockHub::new();
    let (modules, processors) = registries(&hub);
    let config = Config::from_json_str(
        &json!({
            "modules": [
                { "id": "tick", "type": "time.interval", "params": { "interval_ms": 0 } },
                { "id": "sink", "type": "test.mock" }
            ],
            "routes": [{
                "input": "sink",
                "processors": [{ "type": "float.scale", "params": { "in_min": 1, "in_max": 1,
                                  "out_min": 0, "out_max": 1 } }],
                "output": "sink"
            }]
        })
        .to_string(),
    )
    .unwrap();

    let (router, module_errors, route_errors) = Router::new(&config, &modules, &processors);

    assert_eq!(module_errors.len(), 1);
    assert_eq!(module_errors[0].id, "tick");
    assert_eq!(route_errors.len(), 1);
    assert_eq!(route_errors[0].source.position(), 0);
    assert_eq!(router.module_ids(), vec!["sink".to_string()]);
    assert_eq!(router.route_count(), 0);
}

#[tokio::test]
async fn test_tcp_to_mock_end_to_end() {
    let port = find_available_port().await;
    let hub = MockHub::new();
    let (modules, processors) = registries(&hub);
    let config = Config::from_json_str(
        &json!({
            "modules": [
                { "id": "net", "type": "net.tcp.server",
                  "params": { "ip": "127.0.0.1", "port": port, "framing": "SLIP" } },
                { "id": "sink", "type": "test.mock" },
                { "id": "ack", "type": "test.mock" }
            ],
            "routes": [
                {
                    "input": "net",
                    "processors": [{ "type": "string.decode" }, { "type": "int.parse" }],
                    "output": "sink"
                },
                { "input": "ack", "output": "net" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let mut running = TestRouter::start(&config, &modules, &processors);
    assert!(running.module_errors.is_empty());

    // Retry until the server module is listening
    let mut client = None;
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
            client = Some(stream);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let mut client = client.expect("server module never listened");

    client.write_all(&[0xC0, b'4', b'2', 0xC0]).await.unwrap();

    let sink = hub.module("sink").unwrap();
    assert!(sink.outputs.wait_for_count(1, DEFAULT_TIMEOUT).await);
    assert_eq!(sink.outputs.payloads(), vec![Payload::Int(42)]);

    // A client is now connected; routed output reaches it SLIP-encoded
    let outcome = running
        .router()
        .handle_input("ack", Payload::from("ok"))
        .await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);

    let mut frame = [0u8; 4];
    client.read_exact(&mut frame).await.unwrap();
    assert_eq!(frame, [0xC0, b'o', b'k', 0xC0]);

    assert!(running.shutdown().await);
}
