use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use weir::StdError;

pub use tokio_util::sync::CancellationToken;

use crate::defer;

/// A long-running service stopped through a [`CancellationToken`].
pub trait Daemon: Send + Sync + 'static {
    fn run(
        &self,
        shutdown: CancellationToken,
    ) -> impl Future<Output = Result<(), StdError>> + Send;

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

#[async_trait]
trait DynDaemon: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError>;
}

#[async_trait]
impl<T> DynDaemon for T
where
    T: Daemon,
{
    fn name(&self) -> &'static str {
        Daemon::name(self)
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError> {
        Daemon::run(self, shutdown).await
    }
}

/// A set of daemons that run together and stop together.
///
/// # Examples
///
/// ```rust
/// use weir::StdError;
/// use weir_base::{CancellationToken, Daemon, Daemons};
///
/// struct Idle;
///
/// impl Daemon for Idle {
///     async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError> {
///         shutdown.cancelled().await;
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), StdError> {
/// let shutdown = CancellationToken::new();
/// shutdown.cancel();
/// Daemons::new().with(Idle).run(shutdown).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Daemons {
    daemons: Vec<Arc<dyn DynDaemon>>,
}

impl Daemons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T>(&mut self, daemon: impl Into<Arc<T>>) -> &mut Self
    where
        T: Daemon,
    {
        let daemon: Arc<T> = daemon.into();
        self.daemons.push(daemon);
        self
    }

    pub fn with<T>(mut self, daemon: impl Into<Arc<T>>) -> Self
    where
        T: Daemon,
    {
        self.add(daemon);
        self
    }

    pub fn len(&self) -> usize {
        self.daemons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daemons.is_empty()
    }

    /// Runs every daemon until the first one exits, then cancels `shutdown`
    /// and waits for the rest.
    ///
    /// Returns the first error reported by any daemon.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError> {
        let span = tracing::info_span!("daemons", count = self.daemons.len());
        let mut futures = JoinSet::new();
        tracing::info!(parent: &span, "Daemons starting");
        for daemon in &self.daemons {
            let shutdown = shutdown.child_token();
            let daemon = daemon.clone();
            futures.spawn(async move {
                let result = daemon.run(shutdown).await;
                (daemon.name(), result)
            });
        }
        tracing::info!(parent: &span, "Daemons running");
        defer! {
            tracing::info!(parent: &span, "Daemons stopped");
        };
        let mut first_error = None;
        while let Some(result) = futures.join_next().await {
            shutdown.cancel();
            let (name, result) = result.map_err(Box::new)?;
            if let Err(err) = result {
                tracing::error!(parent: &span, daemon = name, %err, "Daemon failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Cancels `shutdown` on Ctrl+C. Returns early if `shutdown` is cancelled first.
pub async fn shutdown_on_ctrl_c(shutdown: CancellationToken) -> Result<(), StdError> {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
    Ok(())
}
