//! User storage.
//!
//! The first consumer of the generic data layer: every query below goes
//! through [`database::exec`], [`database::query_one`] or
//! [`database::query_many`] with a named-parameter template.

use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use uuid::Uuid;

use crate::database::{self, Params};
use crate::impl_bind;
use crate::web::{Context, FieldError};

/// A user as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[sqlx(default)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// Unix seconds.
    pub date_created: i64,
    /// Unix seconds.
    pub date_updated: i64,
}

impl_bind!(User { user_id, name, email, date_created, date_updated });

/// What a client supplies to create a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// What a client supplies to update a user. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validating data: {}", describe(.0))]
    Validation(Vec<FieldError>),
    #[error("user not found")]
    NotFound,
    #[error("ID is not in its proper form")]
    InvalidId,
    #[error("{op}: {source}")]
    Database {
        op: String,
        #[source]
        source: database::Error,
    },
}

fn describe(fields: &[FieldError]) -> String {
    fields.iter().map(|f| format!("{}: {}", f.field, f.error)).collect::<Vec<_>>().join(", ")
}

/// Keeps the data layer's sentinels distinguishable; everything else gets
/// the operation as context.
fn wrap(op: impl Into<String>) -> impl FnOnce(database::Error) -> Error {
    move |source| match source {
        database::Error::NotFound => Error::NotFound,
        database::Error::InvalidId => Error::InvalidId,
        source => Error::Database { op: op.into(), source },
    }
}

/// Manages the set of APIs for user access.
#[derive(Debug, Clone)]
pub struct Store {
    pool: AnyPool,
}

impl Store {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Inserts a new user. `now` is unix seconds.
    pub async fn create(&self, ctx: &Context, nu: NewUser, now: i64) -> Result<User, Error> {
        check(&[("name", Some(&nu.name)), ("email", Some(&nu.email))])?;

        let usr = User {
            user_id: Uuid::new_v4().to_string(),
            name: nu.name,
            email: nu.email,
            date_created: now,
            date_updated: now,
        };

        const Q: &str = "
        INSERT INTO users
            (user_id, name, email, date_created, date_updated)
        VALUES
            (:user_id, :name, :email, :date_created, :date_updated)";

        database::exec(ctx, &self.pool, Q, &usr)
            .await
            .map_err(wrap("inserting user"))?;
        Ok(usr)
    }

    /// Applies `uu` to an existing user and returns the result.
    pub async fn update(&self, ctx: &Context, user_id: &str, uu: UpdateUser, now: i64) -> Result<User, Error> {
        check_id(user_id).map_err(wrap("checking user_id"))?;
        check(&[("name", uu.name.as_ref()), ("email", uu.email.as_ref())])?;

        let mut usr = self.query_by_id(ctx, user_id).await?;
        if let Some(name) = uu.name {
            usr.name = name;
        }
        if let Some(email) = uu.email {
            usr.email = email;
        }
        usr.date_updated = now;

        const Q: &str = "
        UPDATE
            users
        SET
            name = :name,
            email = :email,
            date_updated = :date_updated
        WHERE
            user_id = :user_id";

        database::exec(ctx, &self.pool, Q, &usr)
            .await
            .map_err(wrap(format!("updating user_id[{user_id}]")))?;
        Ok(usr)
    }

    /// Removes a user. Deleting a user that does not exist is not an error.
    pub async fn delete(&self, ctx: &Context, user_id: &str) -> Result<(), Error> {
        check_id(user_id).map_err(wrap("checking user_id"))?;

        const Q: &str = "DELETE FROM users WHERE user_id = :user_id";

        database::exec(ctx, &self.pool, Q, &Params::new().with("user_id", user_id))
            .await
            .map_err(wrap(format!("deleting user_id[{user_id}]")))?;
        Ok(())
    }

    /// One page of users ordered by id. Pages start at 1.
    pub async fn query(&self, ctx: &Context, page_number: u32, rows_per_page: u32) -> Result<Vec<User>, Error> {
        let mut invalid = Vec::new();
        if page_number < 1 {
            invalid.push(FieldError::new("page", "must be at least 1"));
        }
        if rows_per_page < 1 {
            invalid.push(FieldError::new("rows", "must be at least 1"));
        }
        if !invalid.is_empty() {
            return Err(Error::Validation(invalid));
        }

        // Both factors fit in u32, so the product fits in u64; it may not
        // fit in the i64 the database takes.
        let offset = u64::from(page_number - 1) * u64::from(rows_per_page);
        let Ok(offset) = i64::try_from(offset) else {
            return Err(Error::Validation(vec![FieldError::new("page", "out of range for this page size")]));
        };

        let data = Params::new()
            .with("offset", offset)
            .with("rows_per_page", rows_per_page);

        const Q: &str = "SELECT * FROM users ORDER BY user_id LIMIT :rows_per_page OFFSET :offset";

        database::query_many(ctx, &self.pool, Q, &data)
            .await
            .map_err(wrap("selecting users"))
    }

    pub async fn query_by_id(&self, ctx: &Context, user_id: &str) -> Result<User, Error> {
        check_id(user_id).map_err(wrap("checking user_id"))?;

        const Q: &str = "SELECT * FROM users WHERE user_id = :user_id";

        database::query_one(ctx, &self.pool, Q, &Params::new().with("user_id", user_id))
            .await
            .map_err(wrap(format!("selecting user_id[{user_id}]")))
    }

    pub async fn query_by_email(&self, ctx: &Context, email: &str) -> Result<User, Error> {
        const Q: &str = "SELECT * FROM users WHERE email = :email";

        database::query_one(ctx, &self.pool, Q, &Params::new().with("email", email))
            .await
            .map_err(wrap(format!("selecting email[{email:?}]")))
    }
}

fn check_id(user_id: &str) -> Result<(), database::Error> {
    Uuid::parse_str(user_id).map(|_| ()).map_err(|_| database::Error::InvalidId)
}

/// Validates the supplied fields; `None` means "not supplied" and passes.
fn check(fields: &[(&str, Option<&String>)]) -> Result<(), Error> {
    let mut invalid = Vec::new();
    for (field, value) in fields {
        let Some(value) = value else { continue };
        match *field {
            "name" if value.trim().is_empty() => {
                invalid.push(FieldError::new("name", "must not be empty"));
            }
            "email" if !valid_email(value) => {
                invalid.push(FieldError::new("email", "must be a valid email address"));
            }
            _ => {}
        }
    }
    if invalid.is_empty() { Ok(()) } else { Err(Error::Validation(invalid)) }
}

fn valid_email(email: &str) -> bool {
    matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && domain.contains('.'))
}
