//! Error-to-response translation.

use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use tracing::{error, info};

use crate::web::{BoxedHandler, Error, FieldError, Middleware, Response, from_fn};

/// The JSON body of every error response.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    fields: &'a [FieldError],
}

/// Translates errors from the inner chain into responses.
///
/// Trusted errors keep their status and message. Anything else is logged
/// with full detail and answered with a generic `500`. Errors that call
/// for a shutdown are passed on up once their status is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Errors;

impl Middleware for Errors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        from_fn(move |ctx, req| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let err = match next.call(ctx.clone(), req).await {
                    Ok(response) => return Ok(response),
                    Err(err) => err,
                };

                let v = ctx.values()?;
                if err.is_trusted() {
                    info!(trace_id = %v.trace_id(), error = %err, "request error");
                } else {
                    error!(trace_id = %v.trace_id(), error = %err, "request error");
                }

                let response = error_response(&err);
                v.set_status_code(response.status_code().as_u16());

                if err.is_shutdown() {
                    return Err(err);
                }
                Ok(response)
            })
        })
    }
}

/// The response a client sees for `err`. Only trusted errors disclose
/// anything beyond the status.
pub(crate) fn error_response(err: &Error) -> Response {
    let (status, body) = match err {
        Error::Request(re) => (re.status(), ErrorBody { error: re.message(), fields: re.fields() }),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody { error: "Internal Server Error", fields: &[] },
        ),
    };
    Response::encode(status, &body).unwrap_or_else(|_| Response::status(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::{Context, Handler, Request, RequestError, Values};
    use http::Method;

    async fn not_found(_ctx: Context, _req: Request) -> Result<Response, Error> {
        Err(RequestError::new(StatusCode::NOT_FOUND, "user not found").into())
    }

    async fn broken(_ctx: Context, _req: Request) -> Result<Response, Error> {
        Err(Error::internal("connection reset by peer"))
    }

    async fn call(handler: impl Handler) -> (Response, Context) {
        let ctx = Context::background().with_values(Values::new());
        let chain = Errors.wrap(handler.into_boxed_handler());
        let res = chain.call(ctx.clone(), Request::new(Method::GET, "/")).await.unwrap();
        (res, ctx)
    }

    #[tokio::test]
    async fn trusted_errors_keep_status_and_message() {
        let (res, ctx) = call(not_found).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), br#"{"error":"user not found"}"#);
        assert_eq!(ctx.values().unwrap().status_code(), 404);
    }

    #[tokio::test]
    async fn untrusted_errors_leak_nothing() {
        let (res, ctx) = call(broken).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), br#"{"error":"Internal Server Error"}"#);
        assert_eq!(ctx.values().unwrap().status_code(), 500);
    }

    #[test]
    fn field_detail_is_serialised() {
        let err: Error = RequestError::new(StatusCode::BAD_REQUEST, "data validation error")
            .with_fields(vec![FieldError::new("name", "must not be empty")])
            .into();
        let res = error_response(&err);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["fields"][0]["field"], "name");
        assert_eq!(body["fields"][0]["error"], "must not be empty");
    }
}
