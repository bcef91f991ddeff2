//! Generic data access.
//!
//! Three calls cover every read and write the service makes:
//!
//! - [`exec`]: run a statement, get the number of rows affected.
//! - [`query_one`]: fetch one row into any [`sqlx::FromRow`] type, or
//!   [`Error::NotFound`].
//! - [`query_many`]: fetch every row, in order, into a `Vec`.
//!
//! Queries use `:name` placeholders filled from a [`Bind`] record, so a new
//! entity type needs a `#[derive(sqlx::FromRow)]` and an
//! [`impl_bind!`](crate::impl_bind) line, not its own scanning code. Values
//! are always sent as bound parameters; the rendered copy of a query exists
//! only for the log.
//!
//! Every call takes the request [`Context`] and gives up promptly when it is
//! canceled or its deadline passes. Nothing is retried.

mod named;
mod value;

use std::time::Duration;

use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Connection, FromRow};
use tracing::{Instrument, debug, info, info_span};

use crate::web::{Context, Interrupted};

pub use named::render;
pub use value::{Bind, Params, Value};

use named::Named;

/// Data-layer failures.
///
/// The sentinels ([`NotFound`](Error::NotFound),
/// [`InvalidId`](Error::InvalidId)) let callers choose a 4xx outcome; the
/// data layer itself never decides what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("ID is not in its proper form")]
    InvalidId,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("query canceled")]
    Canceled,
    #[error("query deadline exceeded")]
    DeadlineExceeded,
    #[error("executing query: {0}")]
    Exec(#[source] sqlx::Error),
    #[error("mapping row: {0}")]
    Map(#[source] sqlx::Error),
    #[error("connecting to database: {0}")]
    Connect(#[source] sqlx::Error),
}

impl From<Interrupted> for Error {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Canceled => Self::Canceled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Connection settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// `postgres://…` in production, `sqlite::memory:` in tests.
    pub url: String,
    pub max_open_conns: u32,
}

/// Opens a connection pool. Safe to call more than once.
pub async fn open(cfg: &Config) -> Result<AnyPool, Error> {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(cfg.max_open_conns)
        .connect(&cfg.url)
        .await
        .map_err(Error::Connect)
}

/// Returns `Ok` once the database answers a round-trip query.
///
/// Pings with a growing back-off until a connection succeeds or `ctx`
/// gives up.
pub async fn status_check(ctx: &Context, pool: &AnyPool) -> Result<(), Error> {
    for attempts in 1_u32.. {
        match ctx.run(ping(pool)).await? {
            Ok(()) => break,
            Err(e) => debug!(attempts, error = %e, "database ping failed"),
        }
        ctx.run(tokio::time::sleep(Duration::from_millis(100) * attempts)).await?;
    }

    ctx.run(sqlx::query("SELECT true").fetch_one(pool))
        .await?
        .map_err(Error::Exec)?;
    Ok(())
}

async fn ping(pool: &AnyPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

/// Executes a statement and returns the number of rows affected.
pub async fn exec<B: Bind + ?Sized>(ctx: &Context, pool: &AnyPool, query: &str, data: &B) -> Result<u64, Error> {
    let (sql, args, rendered) = prepare(query, data)?;
    info!(trace_id = %ctx.trace_id(), query = %rendered, "database.exec");

    let done = ctx
        .run(bind(sqlx::query(&sql), args).execute(pool))
        .instrument(info_span!("database.query", query = %rendered))
        .await?
        .map_err(Error::Exec)?;
    Ok(done.rows_affected())
}

/// Fetches the first row and maps it onto `T` by column name.
///
/// Zero rows is [`Error::NotFound`].
pub async fn query_one<T, B>(ctx: &Context, pool: &AnyPool, query: &str, data: &B) -> Result<T, Error>
where
    T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    B: Bind + ?Sized,
{
    let (sql, args, rendered) = prepare(query, data)?;
    info!(trace_id = %ctx.trace_id(), query = %rendered, "database.query_one");

    let row = ctx
        .run(bind(sqlx::query(&sql), args).fetch_optional(pool))
        .instrument(info_span!("database.query", query = %rendered))
        .await?
        .map_err(Error::Exec)?
        .ok_or(Error::NotFound)?;
    T::from_row(&row).map_err(Error::Map)
}

/// Fetches every row, mapping each onto a fresh `T`, preserving row order.
///
/// Zero rows is an empty `Vec`, not an error.
pub async fn query_many<T, B>(ctx: &Context, pool: &AnyPool, query: &str, data: &B) -> Result<Vec<T>, Error>
where
    T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    B: Bind + ?Sized,
{
    let (sql, args, rendered) = prepare(query, data)?;
    info!(trace_id = %ctx.trace_id(), query = %rendered, "database.query_many");

    let rows = ctx
        .run(bind(sqlx::query(&sql), args).fetch_all(pool))
        .instrument(info_span!("database.query", query = %rendered))
        .await?
        .map_err(Error::Exec)?;
    rows.iter().map(|row| T::from_row(row).map_err(Error::Map)).collect()
}

fn prepare<B: Bind + ?Sized>(query: &str, data: &B) -> Result<(String, Vec<Value>, String), Error> {
    let named = Named::compile(query);
    let args = named.values(data)?;
    Ok((named.sql(), args, named.render(data)))
}

fn bind<'q>(mut query: Query<'q, Any, AnyArguments<'q>>, args: Vec<Value>) -> Query<'q, Any, AnyArguments<'q>> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(v),
            Value::Int(v) => query.bind(v),
            Value::Float(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Bytes(v) => query.bind(v),
        };
    }
    query
}
