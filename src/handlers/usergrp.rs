//! User CRUD over HTTP.
//!
//! Handlers decide which store failures the client may see: not-found,
//! bad ids and validation errors become trusted 4xx errors; everything
//! else stays an untrusted internal error.

use std::time::{SystemTime, UNIX_EPOCH};

use http::StatusCode;
use http::header::{HeaderValue, LOCATION};

use crate::user::{self, NewUser, Store, UpdateUser};
use crate::web::{Context, Error, Request, RequestError, Response};

/// The user handlers, sharing one store.
#[derive(Debug, Clone)]
pub struct Handlers {
    store: Store,
}

impl Handlers {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// `GET /v1/users/{page}/{rows}`
    pub async fn query(self, ctx: Context, req: Request) -> Result<Response, Error> {
        let page = number(&req, "page")?;
        let rows = number(&req, "rows")?;
        let users = self.store.query(&ctx, page, rows).await.map_err(classify)?;
        Response::encode(StatusCode::OK, &users)
    }

    /// `GET /v1/users/{id}`
    pub async fn query_by_id(self, ctx: Context, req: Request) -> Result<Response, Error> {
        let id = req.param("id").unwrap_or_default();
        let usr = self.store.query_by_id(&ctx, id).await.map_err(classify)?;
        Response::encode(StatusCode::OK, &usr)
    }

    /// `POST /v1/users`
    pub async fn create(self, ctx: Context, req: Request) -> Result<Response, Error> {
        let nu: NewUser = req.json()?;
        let usr = self.store.create(&ctx, nu, now()).await.map_err(classify)?;

        let location = HeaderValue::try_from(format!("/v1/users/{}", usr.user_id)).map_err(Error::internal)?;
        Response::builder()
            .status(StatusCode::CREATED)
            .header(LOCATION, location)
            .encode(&usr)
    }

    /// `PUT /v1/users/{id}`
    pub async fn update(self, ctx: Context, req: Request) -> Result<Response, Error> {
        let id = req.param("id").unwrap_or_default();
        let uu: UpdateUser = req.json()?;
        let usr = self.store.update(&ctx, id, uu, now()).await.map_err(classify)?;
        Response::encode(StatusCode::OK, &usr)
    }

    /// `DELETE /v1/users/{id}`
    pub async fn delete(self, ctx: Context, req: Request) -> Result<StatusCode, Error> {
        let id = req.param("id").unwrap_or_default();
        self.store.delete(&ctx, id).await.map_err(classify)?;
        Ok(StatusCode::NO_CONTENT)
    }
}

fn number(req: &Request, name: &str) -> Result<u32, RequestError> {
    let raw = req.param(name).unwrap_or_default();
    raw.parse().map_err(|_| RequestError::new(StatusCode::BAD_REQUEST, format!("invalid {name} format: {raw}")))
}

fn classify(err: user::Error) -> Error {
    match err {
        user::Error::NotFound => RequestError::new(StatusCode::NOT_FOUND, "not found").into(),
        user::Error::InvalidId => RequestError::new(StatusCode::BAD_REQUEST, "ID is not in its proper form").into(),
        user::Error::Validation(fields) => {
            RequestError::new(StatusCode::BAD_REQUEST, "data validation error").with_fields(fields).into()
        }
        err @ user::Error::Database { .. } => Error::internal(err),
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
