//! Action key normalization
//!
//! Every debounced subject is addressed by a `(group, key)` pair. The pair is
//! rendered as `group_key`, with `_` and `\` escaped inside the group so that
//! the first unescaped separator always marks the group boundary:
//!
//! | group        | key     | rendered              |
//! |--------------|---------|-----------------------|
//! | `default`    | `42`    | `default_42`          |
//! | `post_likes` | `42`    | `post\_likes_42`      |
//! | `post`       | `likes_42` | `post_likes_42`    |
//!
//! Two distinct pairs never render to the same string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the group and key portions of a rendered key
const SEPARATOR: char = '_';

/// Escape character used inside the group portion
const ESCAPE: char = '\\';

/// Group used when a caller does not name one
pub const DEFAULT_GROUP: &str = "default";

/// Caller-supplied subject identifier (a post id, a button name, ...)
///
/// Strings and integers are both accepted. They are compared by their
/// rendered form, so `"7"` and `7` address the same subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKey::Int(n) => write!(f, "{}", n),
            SubjectKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SubjectKey {
    fn from(s: &str) -> Self {
        SubjectKey::Str(s.to_string())
    }
}

impl From<String> for SubjectKey {
    fn from(s: String) -> Self {
        SubjectKey::Str(s)
    }
}

impl From<&String> for SubjectKey {
    fn from(s: &String) -> Self {
        SubjectKey::Str(s.clone())
    }
}

macro_rules! subject_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SubjectKey {
                fn from(n: $ty) -> Self {
                    SubjectKey::Int(n as i64)
                }
            }
        )*
    };
}

subject_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

// Values above i64::MAX keep their exact rendering as strings
impl From<u64> for SubjectKey {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(v) => SubjectKey::Int(v),
            Err(_) => SubjectKey::Str(n.to_string()),
        }
    }
}

impl From<usize> for SubjectKey {
    fn from(n: usize) -> Self {
        SubjectKey::from(n as u64)
    }
}

/// Normalized identifier of one debounced subject
///
/// Equality and hashing go through the rendered form, which is injective
/// over `(group, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    rendered: String,
    group: String,
    key: String,
}

impl ActionKey {
    /// Build the key for `key` inside `group`
    pub fn new(group: &str, key: impl Into<SubjectKey>) -> Self {
        let key = key.into().to_string();
        let mut rendered = escape_group(group);
        rendered.push(SEPARATOR);
        rendered.push_str(&key);

        Self {
            rendered,
            group: group.to_string(),
            key,
        }
    }

    /// Build the key for `key` inside the default group
    pub fn in_default_group(key: impl Into<SubjectKey>) -> Self {
        Self::new(DEFAULT_GROUP, key)
    }

    /// Group portion, unescaped
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Key portion as supplied by the caller
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rendered `group_key` form
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Whether this key belongs to `group`
    pub fn in_group(&self, group: &str) -> bool {
        self.group == group
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl AsRef<str> for ActionKey {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

fn escape_group(group: &str) -> String {
    let mut out = String::with_capacity(group.len() + 1);
    for c in group.chars() {
        if c == ESCAPE || c == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}
