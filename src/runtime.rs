//! Process bootstrap: logging, a hyper listener bound to [`Config::listen_addr`], and a
//! Ctrl+C-triggered graceful shutdown.
//!
//! Grounded on the teacher's `runtime/native.rs` (`init_logging`, `shutdown_signal`,
//! `launch`/`run_server`), but serving connections through
//! `breeze_hyper::Hyper` (which already implements [`breeze_core::Server`]) instead of
//! duplicating hyper's connection-handling loop a second time. That duplication in the
//! teacher's own tree is also where its `unsafe` `ConnectionWrapper` lives, despite the
//! crate denying unsafe code at the root — reusing `breeze-hyper` avoids re-introducing
//! it here.

use std::future::Future;
use std::sync::Arc;

use async_channel::{bounded, Receiver};
use async_executor::Executor as AsyncExecutor;
use async_net::TcpListener;
use breeze_hyper::Hyper;
use executor_core::try_init_global_executor;
use futures_lite::stream;
use tracing::{debug, error, info, warn};
use tracing_log::log::LevelFilter as LogLevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::routing::Router;

/// Initialize the tracing subscriber + color-eyre once per process.
///
/// # Panics
///
/// If the env filter fails to build.
pub fn init_logging() {
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if let Err(error) = color_eyre::install() {
            eprintln!("failed to install color-eyre: {error}");
        }

        let _ = tracing_log::LogTracer::builder()
            .with_max_level(LogLevelFilter::Trace)
            .init();

        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .expect("failed to build env filter");

        if tracing::dispatcher::has_been_set() {
            return;
        }

        if let Err(error) = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .try_init()
        {
            tracing::debug!("tracing subscriber already initialized: {error:?}");
        }
    });
}

fn shutdown_signal() -> Receiver<()> {
    let (tx, rx) = bounded(1);
    if let Err(error) = ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    }) {
        warn!("Unable to install Ctrl+C handler: {error}");
    }
    rx
}

/// Initialize logging, bind `config.listen_addr`, and serve `router` until Ctrl+C.
///
/// `factory` builds the router inside the runtime's own executor context, mirroring the
/// teacher's `launch`, which awaits an async endpoint factory before entering the accept
/// loop.
pub fn run<Fut>(config: Config, factory: impl FnOnce() -> Fut)
where
    Fut: Future<Output = Router> + Send + 'static,
{
    init_logging();

    let executor = Arc::new(AsyncExecutor::new());
    if try_init_global_executor(executor.clone()).is_err() {
        debug!("Global executor already initialized; reusing existing instance");
    }

    let executor_clone = Arc::clone(&executor);
    async_io::block_on(executor.run(async move {
        info!("breeze application starting up");

        let router = factory().await;
        match serve(executor_clone, config, router).await {
            Ok(()) => info!("breeze server shut down gracefully"),
            Err(error) => error!("breeze server terminated: {error}"),
        }
    }));
}

async fn serve(
    executor: Arc<AsyncExecutor<'static>>,
    config: Config,
    router: Router,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("breeze listening on http://{}", listener.local_addr()?);

    let connections = Box::pin(stream::unfold(listener, |listener| async move {
        let result = listener.accept().await;
        Some((result.map(|(stream, _addr)| stream), listener))
    }));

    let shutdown_rx = shutdown_signal();

    let serve_future = Hyper.serve(
        executor.clone(),
        |error: std::io::Error| error!("accept error: {error}"),
        connections,
        router,
    );

    futures_lite::future::race(serve_future, async move {
        let _ = shutdown_rx.recv().await;
        info!("Ctrl+C received, stopping accept loop");
    })
    .await;

    Ok(())
}
