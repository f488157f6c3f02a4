use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use weir::StdError;
use weir_base::{CancellationToken, Daemon, Daemons, shutdown_on_ctrl_c};

#[derive(Default)]
struct Waiting {
    stopped: Arc<AtomicUsize>,
}

impl Daemon for Waiting {
    async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError> {
        shutdown.cancelled().await;
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Finishing;

impl Daemon for Finishing {
    async fn run(&self, _shutdown: CancellationToken) -> Result<(), StdError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }
}

struct Failing;

impl Daemon for Failing {
    async fn run(&self, _shutdown: CancellationToken) -> Result<(), StdError> {
        Err("bind failed".into())
    }
}

#[tokio::test]
async fn test_daemons_empty() {
    let daemons = Daemons::new();
    assert!(daemons.is_empty());
    daemons.run(CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn test_daemons_stop_on_first_exit() {
    let stopped = Arc::new(AtomicUsize::new(0));
    let daemons = Daemons::new()
        .with(Waiting {
            stopped: stopped.clone(),
        })
        .with(Waiting {
            stopped: stopped.clone(),
        })
        .with(Finishing);
    assert_eq!(daemons.len(), 3);
    let shutdown = CancellationToken::new();
    daemons.run(shutdown.clone()).await.unwrap();
    assert_eq!(stopped.load(Ordering::SeqCst), 2);
    assert!(shutdown.is_cancelled());
}

#[tokio::test]
async fn test_daemons_stop_on_shutdown() {
    let stopped = Arc::new(AtomicUsize::new(0));
    let daemons = Daemons::new().with(Waiting {
        stopped: stopped.clone(),
    });
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { daemons.run(shutdown).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_daemons_error() {
    let stopped = Arc::new(AtomicUsize::new(0));
    let daemons = Daemons::new()
        .with(Waiting {
            stopped: stopped.clone(),
        })
        .with(Failing);
    let err = daemons.run(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "bind failed");
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_on_ctrl_c_cancelled() {
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    shutdown_on_ctrl_c(shutdown).await.unwrap();
}
