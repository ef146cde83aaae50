use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{debug, info, warn};

use crate::{dispatcher::Dispatcher, registry::Registry};

/// Pause after a failed `accept` so descriptor exhaustion does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds `listen` and serves until ctrl-c.
pub async fn serve(listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    let manager = Manager::new(listener);
    info!("manager listening on {}", manager.local_addr()?);
    manager.run_until_ctrl_c().await
}

/// Accepts connections and runs one dispatcher task per peer.
///
/// There is no connection limit; every accepted socket gets its own task.
pub struct Manager {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl Manager {
    pub fn new(listener: TcpListener) -> Self {
        Self::with_registry(listener, Arc::new(Registry::new()))
    }

    pub fn with_registry(listener: TcpListener, registry: Arc<Registry>) -> Self {
        Self { listener, registry }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Manager { listener, registry } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("manager shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    if let Some(pause) = handle_accept_result(accept_result, &registry) {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

/// Returns how long to pause before the next `accept`, if at all.
fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    registry: &Arc<Registry>,
) -> Option<Duration> {
    match result {
        Ok((stream, peer)) => {
            spawn_dispatcher(stream, peer, registry);
            None
        }
        Err(err) => {
            warn!(error = ?err, "failed to accept connection");
            Some(ACCEPT_BACKOFF)
        }
    }
}

fn spawn_dispatcher(mut stream: TcpStream, peer: SocketAddr, registry: &Arc<Registry>) {
    debug!(peer = %peer, "connection accepted");
    let dispatcher = Dispatcher::new(Arc::clone(registry), peer);
    tokio::spawn(async move {
        if let Err(err) = dispatcher.run(&mut stream).await {
            warn!(peer = %peer, error = %err, "connection closed with error");
        }
    });
}
