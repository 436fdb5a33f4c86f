use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::api::App;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Serve the dashboard API on `listener` until `shutdown` completes.
///
/// Open connections get a grace period to finish after the shutdown signal.
pub async fn run<F>(listener: TcpListener, app: App, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;

    let http_server = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();

    let mut shutdown = std::pin::pin!(shutdown);

    info!("Server running at http://{local_addr}");

    loop {
        let (socket, remote) = tokio::select! {
            res = listener.accept() => {
                match res {
                    Ok(conn) => conn,
                    Err(err) => {
                        error!("Error accepting connection: {err}");
                        continue;
                    }
                }
            }
            _ = shutdown.as_mut() => {
                break;
            }
        };
        debug!("Accepted connection from: {}", remote);

        let app = app.clone();
        let service = service_fn(move |req| {
            let app = app.clone();
            async move { Ok::<_, Infallible>(app.handle(req).await) }
        });

        let conn = http_server.serve_connection(TokioIo::new(socket), service);
        let conn = graceful.watch(conn.into_owned());
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Connection from {} closed with error: {}", remote, e);
            }
        });
    }

    tokio::select! {
        () = graceful.shutdown() => {
            debug!("Gracefully shutdown!");
        },
        () = tokio::time::sleep(SHUTDOWN_GRACE) => {
            debug!(
                "Waited {} seconds for graceful shutdown, aborting...",
                SHUTDOWN_GRACE.as_secs()
            );
        }
    }

    info!("Server is stopped");
    Ok(())
}
