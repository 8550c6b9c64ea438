//! Periodic tick source

use async_trait::async_trait;
use cuebridge_core::{Module, ModuleConfig, ModuleContext, ModuleError, ParamError, Payload};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use super::{log_outcome, StopSignal};

/// Dispatches `Payload::Int(n)` every `interval_ms`, counting from 1
pub struct IntervalModule {
    id: String,
    period: Duration,
    signal: StopSignal,
}

impl IntervalModule {
    pub const TYPE: &'static str = "time.interval";

    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let interval_ms = config.params.get_uint("interval_ms")?;
        if interval_ms == 0 {
            return Err(ParamError::Invalid {
                key: "interval_ms".into(),
                reason: "must be greater than zero".into(),
            }
            .into());
        }

        Ok(Self {
            id: config.id.clone(),
            period: Duration::from_millis(interval_ms),
            signal: StopSignal::default(),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Module for IntervalModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn module_type(&self) -> &str {
        Self::TYPE
    }

    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let cancel = self.signal.begin(&ctx);
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Interval {} ticking every {:?}", self.id, self.period);

        let mut count: i64 = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    count += 1;
                    let outcome = ctx.dispatch.handle_input(&self.id, Payload::Int(count)).await;
                    log_outcome(&self.id, &outcome);
                }
            }
        }

        info!("Interval {} stopped after {} ticks", self.id, count);
        Ok(())
    }

    fn stop(&self) {
        self.signal.stop();
    }

    async fn output(&self, _payload: Payload) -> Result<(), ModuleError> {
        Err(ModuleError::Unsupported(format!(
            "{} does not accept output",
            Self::TYPE
        )))
    }
}
