//! Binding records: named values that fill a query's placeholders.

use std::fmt;

use uuid::Uuid;

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// How a value reads in a rendered (log-only) query.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "{:?}", String::from_utf8_lossy(v)),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self { Self::$variant(v.into()) }
        })*
    };
}

value_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    &String => Text,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self { Self::Text(v.to_string()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A record whose fields can fill named placeholders.
///
/// Implement it for a struct with [`impl_bind!`](crate::impl_bind), or use
/// [`Params`] for one-off bindings.
pub trait Bind: Send + Sync {
    /// The value bound to `name`, or `None` if the record has no such field.
    fn value(&self, name: &str) -> Option<Value>;
}

/// Binds nothing; for queries without placeholders.
impl Bind for () {
    fn value(&self, _name: &str) -> Option<Value> { None }
}

impl<B: Bind + ?Sized> Bind for &B {
    fn value(&self, name: &str) -> Option<Value> { (**self).value(name) }
}

/// An ad-hoc binding record.
///
/// ```rust
/// use sales::database::{Bind, Params, Value};
///
/// let p = Params::new().with("user_id", "42").with("limit", 10);
/// assert_eq!(p.value("limit"), Some(Value::Int(10)));
/// assert_eq!(p.value("offset"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<(String, Value)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `name`.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_owned(), value)),
        }
        self
    }
}

impl Bind for Params {
    fn value(&self, name: &str) -> Option<Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
    }
}

/// Implements [`Bind`](crate::database::Bind) for a struct by listing the
/// fields that may be bound. Each field is bound under its own name.
///
/// ```rust
/// use sales::database::{Bind, Value};
///
/// struct Product { id: i64, name: String }
/// sales::impl_bind!(Product { id, name });
///
/// let p = Product { id: 7, name: "lamp".into() };
/// assert_eq!(p.value("name"), Some(Value::Text("lamp".into())));
/// ```
#[macro_export]
macro_rules! impl_bind {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::database::Bind for $ty {
            fn value(&self, name: &str) -> ::std::option::Option<$crate::database::Value> {
                match name {
                    $(stringify!($field) => ::std::option::Option::Some(
                        $crate::database::Value::from(::std::clone::Clone::clone(&self.$field)),
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_bytes_render_quoted() {
        assert_eq!(Value::from("it's").to_string(), r#""it's""#);
        assert_eq!(Value::from(b"ab".as_slice()).to_string(), r#""ab""#);
        assert_eq!(Value::from(42_i32).to_string(), "42");
        assert_eq!(Value::from(None::<String>).to_string(), "NULL");
        assert_eq!(Value::from(true).to_string(), "true");
    }

    #[test]
    fn params_replace_existing_names() {
        let p = Params::new().with("a", 1).with("a", 2);
        assert_eq!(p.value("a"), Some(Value::Int(2)));
    }
}
