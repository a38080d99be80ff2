//! Parameterized SQL fragments.
//!
//! A [`QueryFragment`] pairs SQL text with the values bound to the named
//! placeholders it contains. Fragments are immutable and compose with `+`:
//!
//! ```
//! use sqlbind_core::{Binder, QueryFragment, Value};
//!
//! let binder = Binder::new();
//! let q = "select * from student where " + binder.bind("id", 7_i64) + " limit 1";
//! assert_eq!(q.text(), "select * from student where :0_id limit 1");
//! assert_eq!(q.bindings()[0].1, Value::Integer(7));
//! ```
//!
//! Placeholder names come from a [`Binder`], which owns a monotonically
//! increasing counter. Two fragments produced by the same binder never share a
//! placeholder name. Fragments from different binders can: composing two
//! bindings of one name to different values is a conflict. [`try_concat`]
//! reports it at once; `+` records it and the fragment is rejected when it is
//! executed.
//!
//! [`try_concat`]: QueryFragment::try_concat

use crate::error::{Error, Result};
use crate::value::Value;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

/// Immutable SQL text plus its ordered placeholder bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFragment {
    text: String,
    bindings: Vec<(String, Value)>,
    conflicts: Vec<String>,
}

impl QueryFragment {
    /// A fragment of literal SQL with no bindings.
    pub fn literal(sql: impl Into<String>) -> Self {
        Self {
            text: sql.into(),
            bindings: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Assemble a fragment from already-placed text and bindings.
    ///
    /// Callers are responsible for every placeholder in `text` having exactly
    /// one entry in `bindings`; prefer [`Binder::bind`] and composition.
    pub fn from_parts(text: impl Into<String>, bindings: Vec<(String, Value)>) -> Self {
        Self {
            text: text.into(),
            bindings,
            conflicts: Vec::new(),
        }
    }

    /// SQL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder bindings in the order they were created.
    pub fn bindings(&self) -> &[(String, Value)] {
        &self.bindings
    }

    /// Look up the value bound to `placeholder`.
    pub fn binding(&self, placeholder: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(name, _)| name == placeholder)
            .map(|(_, value)| value)
    }

    /// Number of bound placeholders.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// True when there is no SQL text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Placeholders that were bound to two different values during
    /// composition. Executing a fragment with conflicts fails.
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// Concatenate two fragments: texts are joined, bindings unioned.
    ///
    /// A placeholder present on both sides with the same value is kept once.
    /// With different values the first value is kept and the placeholder is
    /// recorded in [`conflicts`](Self::conflicts).
    #[must_use]
    pub fn concat(mut self, other: QueryFragment) -> Self {
        self.text.push_str(&other.text);
        self.conflicts.extend(other.conflicts);
        for (name, value) in other.bindings {
            match self.bindings.iter().find(|(n, _)| *n == name) {
                Some((_, existing)) if *existing == value => {}
                Some(_) => {
                    tracing::warn!(
                        placeholder = %name,
                        "placeholder bound to two different values"
                    );
                    if !self.conflicts.contains(&name) {
                        self.conflicts.push(name);
                    }
                }
                None => self.bindings.push((name, value)),
            }
        }
        self
    }

    /// Like [`concat`](Self::concat), but fails on the first conflicting
    /// placeholder.
    pub fn try_concat(self, other: QueryFragment) -> Result<Self> {
        let joined = self.concat(other);
        match joined.conflicts.first() {
            Some(name) => Err(Error::conflicting_binding("", name)),
            None => Ok(joined),
        }
    }

    /// Prepend literal SQL.
    #[must_use]
    pub fn prefixed(mut self, sql: &str) -> Self {
        self.text.insert_str(0, sql);
        self
    }

    /// Append literal SQL.
    #[must_use]
    pub fn suffixed(mut self, sql: &str) -> Self {
        self.text.push_str(sql);
        self
    }

    /// Consume the fragment, yielding its text and bindings.
    pub fn into_parts(self) -> (String, Vec<(String, Value)>) {
        (self.text, self.bindings)
    }
}

impl From<&str> for QueryFragment {
    fn from(sql: &str) -> Self {
        Self::literal(sql)
    }
}

impl From<String> for QueryFragment {
    fn from(sql: String) -> Self {
        Self::literal(sql)
    }
}

impl Add for QueryFragment {
    type Output = QueryFragment;

    fn add(self, rhs: QueryFragment) -> QueryFragment {
        self.concat(rhs)
    }
}

impl Add<&str> for QueryFragment {
    type Output = QueryFragment;

    fn add(self, rhs: &str) -> QueryFragment {
        self.suffixed(rhs)
    }
}

impl Add<String> for QueryFragment {
    type Output = QueryFragment;

    fn add(self, rhs: String) -> QueryFragment {
        self.suffixed(&rhs)
    }
}

impl Add<QueryFragment> for &str {
    type Output = QueryFragment;

    fn add(self, rhs: QueryFragment) -> QueryFragment {
        rhs.prefixed(self)
    }
}

/// Generator of unique placeholder names.
///
/// Names have the form `:<n>_<key>`, where `n` is taken from a counter that
/// only ever increases for the lifetime of the binder. Keys are kept in the
/// name so that bound SQL stays readable when logged. Fragments that will be
/// composed together should come from the same binder.
#[derive(Debug, Default)]
pub struct Binder {
    next: AtomicU64,
}

impl Binder {
    /// Create a binder whose first placeholder is numbered 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fragment consisting of a single fresh placeholder bound to `value`.
    pub fn bind(&self, key: &str, value: impl Into<Value>) -> QueryFragment {
        let placeholder = self.placeholder(key);
        QueryFragment {
            text: placeholder.clone(),
            bindings: vec![(placeholder, value.into())],
            conflicts: Vec::new(),
        }
    }

    /// Reserve the next placeholder name for `key`.
    pub fn placeholder(&self, key: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let mut name = format!(":{}_", n);
        // Named parameters only accept identifier characters.
        name.extend(
            key.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }),
        );
        name
    }

    /// Number of placeholders handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
