//! Development handlers.

use serde::Serialize;
use tracing::info;

use crate::web::{Context, Error, Request, Response};

#[derive(Serialize)]
struct Status {
    status: &'static str,
}

/// Answers `{"status":"OK"}`; proves the chain end to end.
pub async fn test(ctx: Context, req: Request) -> Result<Response, Error> {
    info!(
        trace_id = %ctx.trace_id(),
        method = %req.method(),
        path = %req.path(),
        "test"
    );
    Response::encode(http::StatusCode::OK, &Status { status: "OK" })
}
