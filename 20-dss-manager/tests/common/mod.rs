//! An in-process manager shared by the integration suites.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Result, bail};
use dss_manager::{client::ManagerClient, manager::Manager, registry::Registry};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle, time::Instant};

pub struct TestManager {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl TestManager {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let manager = Manager::new(listener);
        let addr = manager.local_addr()?;
        let registry = manager.registry();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            let _ = manager.run_until(shutdown).await;
        });

        Ok(Self {
            addr,
            registry,
            shutdown: Some(shutdown_tx),
            server,
        })
    }

    #[allow(dead_code)]
    pub async fn client(&self) -> Result<ManagerClient> {
        ManagerClient::connect(self.addr).await
    }

    /// Re-checks the registry until `condition` holds or `within` elapses.
    #[allow(dead_code)]
    pub async fn wait_for<F, Fut>(&self, within: Duration, what: &str, condition: F) -> Result<()>
    where
        F: Fn(Arc<Registry>) -> Fut,
        Fut: Future<Output = bool>,
    {
        let deadline = Instant::now() + within;
        while !condition(Arc::clone(&self.registry)).await {
            if Instant::now() >= deadline {
                bail!("registry never reached: {what}");
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.server.await;
    }
}
