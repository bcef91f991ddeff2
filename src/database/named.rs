//! Named-placeholder queries.
//!
//! `:name` placeholders are compiled to positional `$1..$n`, one position
//! per occurrence, which both the postgres and sqlite drivers accept. The
//! same parse also renders a human-readable copy of the query with the
//! values substituted. That copy is only ever logged, never executed.

use crate::database::{Bind, Error, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Sql(String),
    Param(String),
}

/// A query template split into literal SQL and named placeholders.
#[derive(Debug, Clone)]
pub(crate) struct Named {
    parts: Vec<Part>,
}

impl Named {
    pub(crate) fn compile(query: &str) -> Self {
        let mut parts = Vec::new();
        let mut sql = String::new();
        let mut chars = query.chars().peekable();

        while let Some(c) = chars.next() {
            if c != ':' {
                sql.push(c);
                continue;
            }
            match chars.peek() {
                // `::` is a postgres cast, not a placeholder.
                Some(':') => {
                    chars.next();
                    sql.push_str("::");
                }
                Some(&n) if n.is_ascii_alphabetic() || n == '_' => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if !(n.is_ascii_alphanumeric() || n == '_' || n == '.') {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    if !sql.is_empty() {
                        parts.push(Part::Sql(std::mem::take(&mut sql)));
                    }
                    parts.push(Part::Param(name));
                }
                _ => sql.push(':'),
            }
        }
        if !sql.is_empty() {
            parts.push(Part::Sql(sql));
        }

        Self { parts }
    }

    /// The executable SQL, placeholders numbered in order of appearance.
    pub(crate) fn sql(&self) -> String {
        let mut out = String::new();
        let mut n = 0;
        for part in &self.parts {
            match part {
                Part::Sql(s) => out.push_str(s),
                Part::Param(_) => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
            }
        }
        out
    }

    /// The values for [`sql`](Self::sql), in placeholder order.
    pub(crate) fn values<B: Bind + ?Sized>(&self, data: &B) -> Result<Vec<Value>, Error> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Param(name) => Some(lookup(data, name)),
                Part::Sql(_) => None,
            })
            .collect()
    }

    /// The query with every placeholder replaced by its value, tabs removed,
    /// newlines flattened and outer spaces trimmed. Failure renders as the
    /// error text.
    pub(crate) fn render<B: Bind + ?Sized>(&self, data: &B) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Sql(s) => out.push_str(s),
                Part::Param(name) => match lookup(data, name) {
                    Ok(v) => out.push_str(&v.to_string()),
                    Err(e) => return e.to_string(),
                },
            }
        }
        out.replace('\t', "").replace('\n', " ").trim_matches(' ').to_owned()
    }
}

fn lookup<B: Bind + ?Sized>(data: &B, name: &str) -> Result<Value, Error> {
    data.value(name)
        .ok_or_else(|| Error::InvalidArgument(format!("could not find name {name} in binding record")))
}

/// Renders `query` with the values from `data` substituted, for logging.
///
/// ```rust
/// use sales::database::{Params, render};
///
/// let q = "SELECT * FROM users\n\tWHERE email = :email AND age > :age";
/// let p = Params::new().with("email", "a@b.c").with("age", 30);
/// assert_eq!(render(q, &p), r#"SELECT * FROM users WHERE email = "a@b.c" AND age > 30"#);
/// ```
pub fn render<B: Bind + ?Sized>(query: &str, data: &B) -> String {
    Named::compile(query).render(data)
}
