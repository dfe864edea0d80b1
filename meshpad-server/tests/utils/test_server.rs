use anyhow::Result;
use meshpad_server::{RelayService, serve_listener};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A relay running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub service: RelayService,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let service = RelayService::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(serve_listener(listener, service.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            addr,
            service,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn root_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}
