//! Shared state handed to every command.
//!
//! Connections are opened on first use so that commands which only touch
//! the database never dial the bus, and vice versa. Each resource registers a
//! close hook with the [`Lifecycle`] when it is opened.

use anyhow::Context;
use genoflow_agent::Agent;
use genoflow_bus::{AmqpBus, MessageBus, Topology};
use genoflow_core::{CallContext, Config};
use genoflow_db::{JobStore, PgJobStore};
use genoflow_infra::Lifecycle;
use genoflow_processing::{DockerExecutor, Runner};
use genoflow_storage::create_storage;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct AppContext {
    config: Config,
    lifecycle: Lifecycle,
    store: OnceCell<Arc<dyn JobStore>>,
    bus: OnceCell<Arc<AmqpBus>>,
    agent: OnceCell<Agent>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::new(),
            store: OnceCell::new(),
            bus: OnceCell::new(),
            agent: OnceCell::new(),
        }
    }

    /// Context with the store and agent already wired, for command tests.
    #[cfg(test)]
    pub(crate) fn with_agent(config: Config, agent: Agent) -> Self {
        let app = Self::new(config);
        let _ = app.store.set(agent.store().clone());
        let _ = app.agent.set(agent);
        app
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn topology(&self) -> Topology {
        Topology::from_config(&self.config.amqp)
    }

    /// Context bounded by the store deadline.
    pub fn store_context(&self) -> CallContext {
        self.lifecycle
            .context()
            .with_timeout(self.config.deadlines.store)
    }

    pub async fn store(&self) -> anyhow::Result<Arc<dyn JobStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let pg = Arc::new(
                    PgJobStore::connect(&self.config.database)
                        .await
                        .context("connecting to the database")?,
                );
                let pool = pg.clone();
                self.lifecycle.on_shutdown("database", move || async move {
                    pool.close().await;
                    Ok(())
                });
                Ok::<_, anyhow::Error>(pg as Arc<dyn JobStore>)
            })
            .await?;
        Ok(store.clone())
    }

    /// Connected bus with every exchange and queue declared.
    pub async fn bus(&self) -> anyhow::Result<Arc<AmqpBus>> {
        let bus = self
            .bus
            .get_or_try_init(|| async {
                let bus = Arc::new(
                    AmqpBus::connect(&self.config.amqp.addr)
                        .await
                        .context("connecting to the message bus")?,
                );
                bus.declare(&self.topology())
                    .await
                    .context("declaring bus topology")?;
                let closer = bus.clone();
                self.lifecycle.on_shutdown("bus", move || async move {
                    closer.close().await?;
                    Ok(())
                });
                Ok::<_, anyhow::Error>(bus)
            })
            .await?;
        Ok(bus.clone())
    }

    pub async fn agent(&self) -> anyhow::Result<Agent> {
        let agent = self
            .agent
            .get_or_try_init(|| async {
                let store = self.store().await?;
                let storage = create_storage(&self.config)
                    .await
                    .context("creating object storage")?;
                let executor = Arc::new(DockerExecutor::new(&self.config.compute));
                let runner = Runner::new(
                    store.clone(),
                    executor,
                    storage,
                    &self.config.compute.mount_dir,
                );
                Ok::<_, anyhow::Error>(Agent::new(store, runner))
            })
            .await?;
        Ok(agent.clone())
    }
}
