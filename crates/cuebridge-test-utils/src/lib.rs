//! Common test helpers and utilities for cuebridge tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - Payload collectors and a recording [`Dispatch`] for driving modules alone
//! - Mock modules registered through a shared [`MockHub`]
//! - Fixed-behaviour processors (pass, drop, fail, append)
//! - A running router with RAII shutdown ([`TestRouter`])

use async_trait::async_trait;
use cuebridge_core::{
    CancellationToken, Config, Dispatch, InputOutcome, Module, ModuleConfig, ModuleContext,
    ModuleError, Params, Payload, ProcessError, Processor,
};
use cuebridge_router::{
    ModuleLoadError, ModuleRegistration, ModuleRegistry, ProcessorRegistration,
    ProcessorRegistry, RouteLoadError, Router,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Module type registered by [`MockHub::registration`]
pub const MOCK_MODULE_TYPE: &str = "test.mock";

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available TCP port for testing
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

// ============================================================================
// Payload Collector
// ============================================================================

/// Thread-safe record of payloads seen by a test double
#[derive(Clone, Default)]
pub struct PayloadCollector {
    payloads: Arc<Mutex<Vec<Payload>>>,
    notify: Arc<Notify>,
    count: Arc<AtomicU32>,
}

impl PayloadCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: Payload) {
        self.payloads.lock().push(payload);
        self.count.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Payload> {
        self.payloads.lock().clone()
    }

    /// Wait until at least `target` payloads have been collected
    pub async fn wait_for_count(&self, target: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, target, max_wait).await
    }
}

// ============================================================================
// Recording Dispatch
// ============================================================================

/// Dispatch double for driving a module without a router.
///
/// Records every submitted event and reports it as matched.
#[derive(Clone, Default)]
pub struct RecordingDispatch {
    events: Arc<Mutex<Vec<(String, Payload)>>>,
    count: Arc<AtomicU32>,
}

impl RecordingDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A module context wired to this dispatch
    pub fn context(&self, cancel: CancellationToken) -> ModuleContext {
        ModuleContext::new(cancel, Arc::new(self.clone()))
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Submitted events as (source id, payload), in arrival order
    pub fn events(&self) -> Vec<(String, Payload)> {
        self.events.lock().clone()
    }

    pub fn payloads(&self) -> Vec<Payload> {
        self.events.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    pub async fn wait_for_count(&self, target: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, target, max_wait).await
    }
}

#[async_trait]
impl Dispatch for RecordingDispatch {
    async fn handle_input(&self, source_id: &str, payload: Payload) -> InputOutcome {
        self.events.lock().push((source_id.to_string(), payload));
        self.count.fetch_add(1, Ordering::SeqCst);
        InputOutcome {
            matched: true,
            errors: Vec::new(),
        }
    }
}

// ============================================================================
// Mock Module
// ============================================================================

/// Module double.
///
/// Params:
/// - `emit`: array of strings dispatched as text payloads once started
/// - `fail_output`: every `output` call fails
/// - `fail_start`: `start` returns an error immediately
pub struct MockModule {
    id: String,
    emit: Vec<String>,
    fail_output: bool,
    fail_start: bool,
    /// Payloads delivered through `output`
    pub outputs: PayloadCollector,
    /// Outcomes of the `emit` dispatches, in order
    pub outcomes: Mutex<Vec<InputOutcome>>,
    pub starts: AtomicU32,
    pub stops: AtomicU32,
    pub exits: AtomicU32,
}

impl MockModule {
    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let emit = match config.params.get_array("emit") {
            Ok(values) => values
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        ModuleError::InvalidConfig("emit entries must be strings".into())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            id: config.id.clone(),
            emit,
            fail_output: config.params.get_bool_or("fail_output", false)?,
            fail_start: config.params.get_bool_or("fail_start", false)?,
            outputs: PayloadCollector::new(),
            outcomes: Mutex::new(Vec::new()),
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            exits: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Module for MockModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn module_type(&self) -> &str {
        MOCK_MODULE_TYPE
    }

    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        if self.fail_start {
            self.exits.fetch_add(1, Ordering::SeqCst);
            return Err(ModuleError::ConnectionFailed("mock start failure".into()));
        }

        for text in &self.emit {
            let outcome = ctx
                .dispatch
                .handle_input(&self.id, Payload::Text(text.clone()))
                .await;
            self.outcomes.lock().push(outcome);
        }

        ctx.cancel.cancelled().await;
        self.exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn output(&self, payload: Payload) -> Result<(), ModuleError> {
        if self.fail_output {
            return Err(ModuleError::Other("mock output failure".into()));
        }
        self.outputs.push(payload);
        Ok(())
    }
}

/// Keeps every [`MockModule`] a registry builds so tests can inspect them
#[derive(Clone, Default)]
pub struct MockHub {
    modules: Arc<Mutex<HashMap<String, Arc<MockModule>>>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration for [`MOCK_MODULE_TYPE`] that records built modules in this hub
    pub fn registration(&self) -> ModuleRegistration {
        let modules = self.modules.clone();
        ModuleRegistration::new(MOCK_MODULE_TYPE, move |config| {
            let module = Arc::new(MockModule::from_config(config)?);
            modules.lock().insert(config.id.clone(), module.clone());
            Ok(module as Arc<dyn Module>)
        })
    }

    pub fn module(&self, id: &str) -> Option<Arc<MockModule>> {
        self.modules.lock().get(id).cloned()
    }
}

// ============================================================================
// Test Processors
// ============================================================================

/// Fixed-behaviour processor
pub enum TestProcessor {
    /// Returns the payload unchanged
    Pass,
    /// Filters every payload
    Drop,
    /// Fails every payload
    Fail,
    /// Appends a suffix to text payloads
    Append(String),
}

impl Processor for TestProcessor {
    fn processor_type(&self) -> &str {
        match self {
            TestProcessor::Pass => "test.pass",
            TestProcessor::Drop => "test.drop",
            TestProcessor::Fail => "test.fail",
            TestProcessor::Append(_) => "test.append",
        }
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        match self {
            TestProcessor::Pass => Ok(Some(payload)),
            TestProcessor::Drop => Ok(None),
            TestProcessor::Fail => Err(ProcessError::Other("test processor failure".into())),
            TestProcessor::Append(suffix) => {
                let text = payload.as_text()?;
                Ok(Some(Payload::Text(format!("{}{}", text, suffix))))
            }
        }
    }
}

/// Register `test.pass`, `test.drop`, `test.fail` and `test.append` (param `suffix`)
pub fn register_test_processors(registry: &ProcessorRegistry) {
    fn fixed(p: TestProcessor) -> Result<Arc<dyn Processor>, ProcessError> {
        Ok(Arc::new(p) as Arc<dyn Processor>)
    }

    registry.register(ProcessorRegistration::new("test.pass", |_| {
        fixed(TestProcessor::Pass)
    }));
    registry.register(ProcessorRegistration::new("test.drop", |_| {
        fixed(TestProcessor::Drop)
    }));
    registry.register(ProcessorRegistration::new("test.fail", |_| {
        fixed(TestProcessor::Fail)
    }));
    registry.register(ProcessorRegistration::new("test.append", |params: &Params| {
        fixed(TestProcessor::Append(params.get_string("suffix")?))
    }));
}

/// Registries with the mock module type and the test processors
pub fn test_registries(hub: &MockHub) -> (ModuleRegistry, ProcessorRegistry) {
    let modules = ModuleRegistry::new();
    modules.register(hub.registration());

    let processors = ProcessorRegistry::new();
    register_test_processors(&processors);

    (modules, processors)
}

// ============================================================================
// Test Router - RAII wrapper with proper cleanup
// ============================================================================

/// A running router that is stopped on drop
pub struct TestRouter {
    router: Arc<Router>,
    handle: Option<tokio::task::JoinHandle<()>>,
    pub module_errors: Vec<ModuleLoadError>,
    pub route_errors: Vec<RouteLoadError>,
}

impl TestRouter {
    /// Build and start a router
    pub fn start(
        config: &Config,
        modules: &ModuleRegistry,
        processors: &ProcessorRegistry,
    ) -> Self {
        let (router, module_errors, route_errors) = Router::new(config, modules, processors);
        let router = Arc::new(router);

        let running = router.clone();
        let handle = tokio::spawn(async move {
            running.start().await;
        });

        Self {
            router,
            handle: Some(handle),
            module_errors,
            route_errors,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Stop the router and wait for every module to exit
    pub async fn shutdown(&mut self) -> bool {
        self.router.stop();
        match self.handle.take() {
            Some(handle) => tokio::time::timeout(DEFAULT_TIMEOUT, handle).await.is_ok(),
            None => true,
        }
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        self.router.stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
