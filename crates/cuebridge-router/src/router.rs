//! Main router implementation
//!
//! The router owns every module instance and every compiled route. It does
//! no polling of its own: modules run their own I/O loops and call back into
//! [`Dispatch::handle_input`] when something arrives, possibly from many
//! tasks at once.

use async_trait::async_trait;
use cuebridge_core::{
    Config, Dispatch, InputOutcome, Module, ModuleContext, ModuleError, OutputError, Payload,
    RoutingError, RoutingErrorKind,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ModuleLoadError, ModuleLoadErrorKind, RouteLoadError},
    registry::{ModuleRegistry, ProcessorRegistry},
    route::Route,
};

/// Modules and routes shared with every module task
struct RouterCore {
    modules: HashMap<String, Arc<dyn Module>>,
    routes: Vec<Route>,
}

/// cuebridge router
pub struct Router {
    core: Arc<RouterCore>,
    cancel: CancellationToken,
}

impl Router {
    /// Build a router from a configuration.
    ///
    /// Never fails outright: invalid modules and routes are skipped and
    /// returned alongside the router, which runs with whatever succeeded.
    pub fn new(
        config: &Config,
        module_registry: &ModuleRegistry,
        processor_registry: &ProcessorRegistry,
    ) -> (Self, Vec<ModuleLoadError>, Vec<RouteLoadError>) {
        let mut modules: HashMap<String, Arc<dyn Module>> = HashMap::new();
        let mut module_errors = Vec::new();

        for (index, module_config) in config.modules.iter().enumerate() {
            let id = module_config.id.clone();
            let reject = |kind: ModuleLoadErrorKind| ModuleLoadError {
                index,
                id: id.clone(),
                kind,
            };

            if id.is_empty() {
                module_errors.push(reject(ModuleLoadErrorKind::EmptyId));
                continue;
            }

            if modules.contains_key(&id) {
                module_errors.push(reject(ModuleLoadErrorKind::DuplicateId(id.clone())));
                continue;
            }

            let Some(constructor) = module_registry.lookup(&module_config.module_type) else {
                module_errors.push(reject(ModuleLoadErrorKind::UnknownType(
                    module_config.module_type.clone(),
                )));
                continue;
            };

            match constructor(module_config) {
                Ok(module) => {
                    info!("Module {} ({}) created", id, module_config.module_type);
                    modules.insert(id.clone(), module);
                }
                Err(e) => module_errors.push(reject(ModuleLoadErrorKind::Construction(e))),
            }
        }

        let mut routes = Vec::new();
        let mut route_errors = Vec::new();

        for (index, route_config) in config.routes.iter().enumerate() {
            match Route::compile(index, route_config, processor_registry) {
                Ok(route) => {
                    if !modules.contains_key(route.output()) {
                        warn!(
                            "Route {} outputs to unknown module {}",
                            index,
                            route.output()
                        );
                    }
                    routes.push(route);
                }
                Err(source) => route_errors.push(RouteLoadError {
                    index,
                    input: route_config.input.clone(),
                    output: route_config.output.clone(),
                    source,
                }),
            }
        }

        for e in &module_errors {
            warn!("Skipping {}", e);
        }
        for e in &route_errors {
            warn!("Skipping {}", e);
        }

        let router = Self {
            core: Arc::new(RouterCore { modules, routes }),
            cancel: CancellationToken::new(),
        };

        (router, module_errors, route_errors)
    }

    /// Run every module until [`Router::stop`] is called.
    ///
    /// Each module gets its own task and a child cancellation token. Once
    /// stopped, every module is signalled and awaited before this returns.
    pub async fn start(&self) {
        let dispatch: Arc<dyn Dispatch> = self.core.clone();
        let mut tasks = JoinSet::new();

        for (id, module) in &self.core.modules {
            let ctx = ModuleContext::new(self.cancel.child_token(), dispatch.clone());
            let module = module.clone();
            let id = id.clone();
            tasks.spawn(async move {
                let result = module.start(ctx).await;
                (id, result)
            });
        }

        info!(
            "Router started with {} modules and {} routes",
            self.core.modules.len(),
            self.core.routes.len()
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(joined) = tasks.join_next() => log_module_exit(joined),
            }
        }

        info!("Router stopping");
        for module in self.core.modules.values() {
            module.stop();
        }

        while let Some(joined) = tasks.join_next().await {
            log_module_exit(joined);
        }
        info!("Router stopped");
    }

    /// Stop the router; `start` returns once every module has exited
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The dispatch capability handed to modules
    pub fn handle(&self) -> Arc<dyn Dispatch> {
        self.core.clone()
    }

    /// Submit an input event as if it came from module `source_id`
    pub async fn handle_input(&self, source_id: &str, payload: Payload) -> InputOutcome {
        self.core.handle_input(source_id, payload).await
    }

    /// Ids of the retained modules, sorted
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.core.modules.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn module(&self, id: &str) -> Option<Arc<dyn Module>> {
        self.core.modules.get(id).cloned()
    }

    pub fn module_count(&self) -> usize {
        self.core.modules.len()
    }

    pub fn route_count(&self) -> usize {
        self.core.routes.len()
    }

    pub fn routes(&self) -> &[Route] {
        &self.core.routes
    }
}

fn log_module_exit(joined: Result<(String, Result<(), ModuleError>), JoinError>) {
    match joined {
        Ok((id, Ok(()))) => debug!("Module {} exited", id),
        Ok((id, Err(e))) => error!("Module {} failed: {}", id, e),
        Err(e) => error!("Module task aborted: {}", e),
    }
}

impl RouterCore {
    /// Run one route for one event; `None` when it delivered or filtered
    async fn run_route(&self, route: &Route, payload: Payload) -> Option<RoutingError> {
        let payload = match route.run(payload) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!("Route {} filtered payload", route.index());
                return None;
            }
            Err(e) => return Some(route.error(RoutingErrorKind::Process(e))),
        };

        let Some(module) = self.modules.get(route.output()) else {
            return Some(route.error(RoutingErrorKind::Output(OutputError::NoModule(
                route.output().to_string(),
            ))));
        };

        match module.output(payload).await {
            Ok(()) => None,
            Err(e) => Some(route.error(RoutingErrorKind::Output(OutputError::Module(e)))),
        }
    }
}

#[async_trait]
impl Dispatch for RouterCore {
    async fn handle_input(&self, source_id: &str, payload: Payload) -> InputOutcome {
        let matched: Vec<&Route> = self
            .routes
            .iter()
            .filter(|route| route.input() == source_id)
            .collect();

        if matched.is_empty() {
            return InputOutcome::unmatched();
        }

        let results = join_all(
            matched
                .into_iter()
                .map(|route| self.run_route(route, payload.clone())),
        )
        .await;

        let errors: Vec<RoutingError> = results.into_iter().flatten().collect();
        for e in &errors {
            debug!("Routing error: {}", e);
        }

        InputOutcome {
            matched: true,
            errors,
        }
    }
}
