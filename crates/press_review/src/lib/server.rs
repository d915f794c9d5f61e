//! HTTP trigger for schedulers that can only make web requests
//! (Cloud Scheduler, uptime pingers and the like).

use std::{future::Future, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    notify::Notifier,
    yt::{TranscriptFetcher, VideoLister},
    PressReviewProcessor, RunReport, Summarizer,
};

pub const SUCCESS_BODY: &str = "AI Press Review Agent completed successfully";

/// Something the trigger endpoint can run.
pub trait Pipeline: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = anyhow::Result<RunReport>> + Send;
}

impl<L, T, S, N> Pipeline for PressReviewProcessor<L, T, S, N>
where
    L: VideoLister + Send + Sync + 'static,
    T: TranscriptFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
{
    fn run(&self) -> impl Future<Output = anyhow::Result<RunReport>> + Send {
        PressReviewProcessor::run(self)
    }
}

struct AppState<P> {
    pipeline: Arc<P>,
    // held for the duration of a run, a second trigger meanwhile is turned away
    run_lock: Arc<Mutex<()>>,
    runs: TaskTracker,
}

/// Builds the trigger router. Runs are spawned onto `runs` so a client hanging up
/// does not cancel them; pass the same tracker to [`serve`].
pub fn router<P: Pipeline>(pipeline: P, runs: TaskTracker) -> Router {
    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        run_lock: Arc::new(Mutex::new(())),
        runs,
    });

    Router::new()
        .route("/", get(trigger::<P>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn trigger<P: Pipeline>(State(state): State<Arc<AppState<P>>>) -> Response {
    let Ok(guard) = state.run_lock.clone().try_lock_owned() else {
        tracing::warn!("Trigger received while a run is in progress");
        return (StatusCode::CONFLICT, "A run is already in progress").into_response();
    };

    let pipeline = state.pipeline.clone();
    let run = state.runs.spawn(async move {
        let _guard = guard;
        pipeline.run().await
    });

    match run.await {
        Ok(Ok(report)) => {
            tracing::info!(?report, "Triggered run completed");
            (StatusCode::OK, SUCCESS_BODY).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = ?e, "Triggered run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("AI Press Review Agent failed: {e}"),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = ?e, "Triggered run panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI Press Review Agent failed: run aborted",
            )
                .into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Serves `router` until `shutdown` is cancelled, then waits for every run
/// spawned onto `runs`, including those whose client already went away.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
    runs: TaskTracker,
) -> anyhow::Result<()> {
    tracing::info!(addr = ?listener.local_addr()?, "Listening for triggers");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    runs.close();
    if !runs.is_empty() {
        tracing::info!(runs = runs.len(), "Waiting for in-flight runs to finish");
    }
    runs.wait().await;

    Ok(())
}

/// Cancels `token` on Ctrl-C or SIGTERM.
pub async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::{io::AsyncWriteExt, net::TcpStream, sync::Notify};
    use tower::ServiceExt;

    #[derive(Default)]
    struct CountingPipeline {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Pipeline for CountingPipeline {
        async fn run(&self) -> anyhow::Result<RunReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("Failed to list videos for all 2 configured channels");
            }
            Ok(RunReport::default())
        }
    }

    struct BlockingPipeline {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl Pipeline for BlockingPipeline {
        async fn run(&self) -> anyhow::Result<RunReport> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(RunReport::default())
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_trigger_runs_pipeline() {
        let pipeline = CountingPipeline::default();
        let runs = pipeline.runs.clone();

        let (status, body) = get(router(pipeline, TaskTracker::new()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SUCCESS_BODY);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_run_returns_server_error() {
        let pipeline = CountingPipeline {
            fail: true,
            ..Default::default()
        };

        let (status, body) = get(router(pipeline, TaskTracker::new()), "/").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("all 2 configured channels"), "{body}");
    }

    #[tokio::test]
    async fn test_health_does_not_run_pipeline() {
        let pipeline = CountingPipeline::default();
        let runs = pipeline.runs.clone();

        let (status, body) = get(router(pipeline, TaskTracker::new()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let router = router(
            BlockingPipeline {
                started: started.clone(),
                release: release.clone(),
            },
            TaskTracker::new(),
        );

        let first = tokio::spawn(get(router.clone(), "/"));
        started.notified().await;

        let (status, _) = get(router, "/").await;
        assert_eq!(status, StatusCode::CONFLICT);

        release.notify_one();
        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SUCCESS_BODY);
    }

    struct SlowPipeline {
        finished: Arc<AtomicBool>,
    }

    impl Pipeline for SlowPipeline {
        async fn run(&self) -> anyhow::Result<RunReport> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(RunReport::default())
        }
    }

    async fn start_slow_server() -> (
        Arc<AtomicBool>,
        std::net::SocketAddr,
        CancellationToken,
        tokio::task::JoinHandle<anyhow::Result<()>>,
    ) {
        let finished = Arc::new(AtomicBool::new(false));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let runs = TaskTracker::new();
        let shutdown = CancellationToken::new();
        let app = router(
            SlowPipeline {
                finished: finished.clone(),
            },
            runs.clone(),
        );
        let server = tokio::spawn(serve(listener, app, shutdown.clone(), runs));

        (finished, addr, shutdown, server)
    }

    async fn trigger_and_hang_up(addr: std::net::SocketAddr) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(stream);
    }

    #[tokio::test]
    async fn test_run_survives_client_disconnect() {
        let (finished, addr, shutdown, server) = start_slow_server().await;

        trigger_and_hang_up(addr).await;
        tokio::time::sleep(Duration::from_millis(800)).await;

        assert!(
            finished.load(Ordering::SeqCst),
            "Run should complete after the client hung up"
        );

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_detached_runs() {
        let (finished, addr, shutdown, server) = start_slow_server().await;

        trigger_and_hang_up(addr).await;
        shutdown.cancel();
        server.await.unwrap().unwrap();

        assert!(
            finished.load(Ordering::SeqCst),
            "serve should only return once the run is done"
        );
    }
}
