//! Shared test helpers: an in-memory store and a log-capturing subscriber.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use sales::database::{self, Config};
use sales::web::Context;
use sqlx::AnyPool;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{self, Layer, SubscriberExt};

pub const USERS_TABLE: &str = "
    CREATE TABLE users (
        user_id      TEXT PRIMARY KEY,
        name         TEXT NOT NULL,
        email        TEXT NOT NULL UNIQUE,
        date_created BIGINT NOT NULL,
        date_updated BIGINT NOT NULL
    )";

/// A fresh, private in-memory database. One connection, so every query
/// sees the same memory.
pub async fn memory_pool() -> AnyPool {
    database::open(&Config { url: "sqlite::memory:".to_owned(), max_open_conns: 1 })
        .await
        .expect("open sqlite")
}

/// [`memory_pool`] with the users table created.
pub async fn users_pool() -> AnyPool {
    let pool = memory_pool().await;
    database::exec(&Context::background(), &pool, USERS_TABLE, &())
        .await
        .expect("create users table");
    pool
}

/// One captured log event.
#[derive(Debug, Clone)]
pub struct Record {
    pub message: String,
    pub fields: HashMap<String, String>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A layer that keeps every event it sees.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<Record>>>);

impl Captured {
    /// Installs the capture as this thread's default subscriber until the
    /// guard is dropped. Use with a current-thread runtime.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let captured = Self::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (captured, guard)
    }

    pub fn records(&self) -> Vec<Record> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_message(&self, message: &str) -> Vec<Record> {
        self.records().into_iter().filter(|r| r.message == message).collect()
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
        let mut visitor = Visitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(Record { message: visitor.message, fields: visitor.fields });
    }
}

#[derive(Default)]
struct Visitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for Visitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }
}

impl Visitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }
}
