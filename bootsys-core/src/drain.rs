//! Best-effort container shutdown ahead of stopping the container runtime.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::remote::{RemoteConnector, RemoteSession};

/// List running containers and stop them: up to 50 `crictl stop` invocations
/// at once, 3 containers each, 5s graceful timeout per container, killed
/// after 15s, with the whole listing-and-dispatch phase killed after 5m.
pub const CONTAINER_STOP_SCRIPT: &str = "crictl ps -q | \
     timeout -s 9 5m xargs -n 3 -P 50 \
     timeout -s 9 --foreground 15s crictl stop --timeout 5";

/// Stop running containers on every host, in parallel.
///
/// Never fails: connection and command failures are logged as warnings and
/// the authoritative runtime stop that follows is left to deal with any
/// survivors. Returns once every host's worker has finished.
pub async fn stop_containers_on_hosts<K: RemoteConnector>(connector: &Arc<K>, hosts: &[String]) {
    let workers: Vec<_> = hosts
        .iter()
        .map(|host| {
            let connector = Arc::clone(connector);
            let host = host.clone();
            tokio::spawn(async move { stop_containers(connector.as_ref(), &host).await })
        })
        .collect();

    let results = futures::future::join_all(workers).await;

    let stopped = results
        .iter()
        .filter(|r| matches!(r, Ok(true)))
        .count();
    for (host, result) in hosts.iter().zip(&results) {
        if let Err(e) = result {
            warn!("Container stop worker for host {} did not finish: {}", host, e);
        }
    }
    info!(
        "Stopped containers cleanly on {} of {} hosts",
        stopped,
        hosts.len()
    );
}

/// Run the container stop script on one host; returns whether it exited cleanly
async fn stop_containers<K: RemoteConnector>(connector: &K, host: &str) -> bool {
    let mut session = match connector.connect(host).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Failed to connect to host {} to stop containers: {}", host, e);
            return false;
        }
    };

    debug!("Stopping containers on host {}", host);
    let clean = match session.execute(CONTAINER_STOP_SCRIPT).await {
        Ok(output) if output.success() => true,
        Ok(output) => {
            warn!(
                "Stopping containerd containers on host {} returned non-zero exit status {}. \
                 Stdout: \"{}\". Stderr: \"{}\".",
                host,
                output.exit_code,
                output.stdout.trim(),
                output.stderr.trim()
            );
            false
        }
        Err(e) => {
            warn!("Failed to stop containers on host {}: {}", host, e);
            false
        }
    };

    session.disconnect().await;
    clean
}
