//! Health checks and counters for the debug listener.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use serde::Serialize;
use sqlx::AnyPool;
use tracing::info;

use crate::database;
use crate::metrics::{Registry, Snapshot};
use crate::web::{Context, Error, Request, Response};

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

/// The debug handlers.
#[derive(Debug, Clone)]
pub struct Handlers {
    build: String,
    metrics: Arc<Registry>,
    pool: AnyPool,
}

#[derive(Serialize)]
struct Vars<'a> {
    build: &'a str,
    #[serde(flatten)]
    metrics: Snapshot,
}

#[derive(Serialize)]
struct Status {
    status: &'static str,
}

/// Liveness detail. The Kubernetes fields come from the Downward API
/// environment and are omitted outside a cluster.
#[derive(Serialize)]
struct Info {
    status: &'static str,
    build: String,
    host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod: Option<String>,
    #[serde(rename = "podIP", skip_serializing_if = "Option::is_none")]
    pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

impl Handlers {
    pub fn new(build: String, metrics: Arc<Registry>, pool: AnyPool) -> Self {
        Self { build, metrics, pool }
    }

    /// The metrics registry, read without blocking any request.
    pub async fn vars(self, _ctx: Context, _req: Request) -> Result<Response, Error> {
        let vars = Vars { build: &self.build, metrics: self.metrics.snapshot() };
        Response::encode(StatusCode::OK, &vars)
    }

    /// Whether the database is reachable. A failed check is a normal `500`
    /// response, not an error, so it is never treated as a fault.
    pub async fn readiness(self, ctx: Context, _req: Request) -> Result<Response, Error> {
        let ctx = ctx.with_timeout(READINESS_TIMEOUT);
        let (status, body) = match database::status_check(&ctx, &self.pool).await {
            Ok(()) => (StatusCode::OK, Status { status: "ok" }),
            Err(e) => {
                info!(trace_id = %ctx.trace_id(), error = %e, "readiness failure");
                (StatusCode::INTERNAL_SERVER_ERROR, Status { status: "db not ready" })
            }
        };
        Response::encode(status, &body)
    }

    /// Simple status info that the service is alive.
    pub async fn liveness(self, _ctx: Context, _req: Request) -> Result<Response, Error> {
        let info = Info {
            status: "up",
            build: self.build,
            host: env("HOSTNAME").unwrap_or_else(|| "unavailable".to_owned()),
            pod: env("KUBERNETES_PODNAME"),
            pod_ip: env("KUBERNETES_NAMESPACE_POD_IP"),
            node: env("KUBERNETES_NODENAME"),
            namespace: env("KUBERNETES_NAMESPACE"),
        };
        Response::encode(StatusCode::OK, &info)
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
