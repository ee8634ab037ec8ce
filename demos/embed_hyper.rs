//! Embedding breeze into your own application instead of calling [`breeze::runtime::run`].
//!
//! # When to use this approach
//!
//! Use this approach when you:
//! - Already have an existing async-io/tokio/async-std application
//! - Need fine-grained control over the listener or executor lifecycle
//! - Want to run a [`breeze::routing::Router`] alongside other services in one process
//!
//! Run with: `cargo run --example embed_hyper` (adjust to wherever this file is wired up
//! as a binary; it is not part of the library build).

use async_net::TcpListener;
use breeze::{Api, Config, Json, Method, OperationOutput};
use breeze_hyper::Hyper;
use futures_lite::stream;
use serde::Serialize;

#[derive(Debug, Serialize, OperationOutput)]
struct StatusResponse {
    status: &'static str,
}

async fn status(_: ()) -> Result<Json<StatusResponse>, breeze::Error> {
    Ok(Json(StatusResponse { status: "running" }))
}

fn build_router() -> breeze::routing::Router {
    let mut api = Api::new("embedded", "0.1.0", Config::default());
    api.operation::<(), Json<StatusResponse>, _, _>(Method::GET, "/status", "get_status", status)
        .expect("operation registers cleanly");
    api.build().expect("no conflicting routes")
}

fn main() -> std::io::Result<()> {
    async_io::block_on(async {
        let router = build_router();

        let addr = "127.0.0.1:3000";
        let listener = TcpListener::bind(addr).await?;
        println!("Embedded breeze server listening on http://{addr}");
        println!("Try: curl http://{addr}/status");

        let connections = Box::pin(stream::unfold(listener, |listener| async move {
            let result = listener.accept().await;
            Some((result.map(|(stream, _addr)| stream), listener))
        }));

        Hyper
            .serve(
                std::sync::Arc::new(async_executor::Executor::new()),
                |err| eprintln!("connection error: {err}"),
                connections,
                router,
            )
            .await;

        Ok(())
    })
}
