//! Operation records, histories and datatype classification.
//!
//! A history is the complete trace of a concurrent execution: every
//! operation carries its invocation and response timestamps. Monitors
//! consume histories under the distinct-value restriction (each value is
//! added at most once and removed at most once per datatype).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Values drawn from a totally ordered domain.
///
/// 64-bit because the stack monitor recovers the single covering value of
/// a position from a running sum of values; 32-bit sums overflow on
/// million-operation histories.
pub type Value = i64;

/// Timestamps. Raw input times are arbitrary non-negative integers; the
/// tuner rewrites them into a dense strictly increasing sequence.
pub type Time = u64;

/// Operation identifiers, unique within one history.
pub type OpId = u32;

/// The sentinel value the CLI reserves for "observed the structure as
/// empty". Never a real value.
pub const DEFAULT_EMPTY_VALUE: Value = -1;

macro_rules! methods {
    ($($variant:ident => $name:literal,)*) => {
        /// Method tags across all supported datatypes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Method {
            $($variant,)*
        }

        impl Method {
            /// The wire name used in history files.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Method::$variant => $name,)*
                }
            }
        }

        impl FromStr for Method {
            type Err = UnknownMethod;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Method::$variant),)*
                    _ => Err(UnknownMethod(s.to_string())),
                }
            }
        }
    };
}

methods! {
    Push => "push",
    Pop => "pop",
    Peek => "peek",
    Enq => "enq",
    Deq => "deq",
    PushFront => "push_front",
    PopFront => "pop_front",
    PeekFront => "peek_front",
    PushBack => "push_back",
    PopBack => "pop_back",
    PeekBack => "peek_back",
    Insert => "insert",
    Poll => "poll",
    ContainsTrue => "contains_true",
    ContainsFalse => "contains_false",
    Remove => "remove",
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A method string that is not one of the supported tags.
#[derive(Debug, Clone, Error)]
#[error("unknown method `{0}`")]
pub struct UnknownMethod(pub String);

/// The four datatypes with a polynomial monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Set,
    Stack,
    Queue,
    PriorityQueue,
}

impl DataKind {
    /// The tag accepted on a history file's first line.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            DataKind::Set => "set",
            DataKind::Stack => "stack",
            DataKind::Queue => "queue",
            DataKind::PriorityQueue => "priorityqueue",
        }
    }

    /// Whether `method` inserts a value for this datatype.
    #[must_use]
    pub fn is_add(self, method: Method) -> bool {
        matches!(
            (self, method),
            (DataKind::Set, Method::Insert)
                | (DataKind::Stack, Method::Push)
                | (DataKind::Queue, Method::Enq)
                | (DataKind::PriorityQueue, Method::Insert)
        )
    }

    /// Whether `method` removes a value for this datatype.
    #[must_use]
    pub fn is_remove(self, method: Method) -> bool {
        matches!(
            (self, method),
            (DataKind::Set, Method::Remove)
                | (DataKind::Stack, Method::Pop)
                | (DataKind::Queue, Method::Deq)
                | (DataKind::PriorityQueue, Method::Poll)
        )
    }

    /// The remove method synthesized when extending a history whose value
    /// was added but never removed.
    #[must_use]
    pub fn canonical_remove(self) -> Method {
        match self {
            DataKind::Set => Method::Remove,
            DataKind::Stack => Method::Pop,
            DataKind::Queue => Method::Deq,
            DataKind::PriorityQueue => Method::Poll,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DataKind {
    type Err = UnknownDataKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(DataKind::Set),
            "stack" => Ok(DataKind::Stack),
            "queue" => Ok(DataKind::Queue),
            "priorityqueue" => Ok(DataKind::PriorityQueue),
            _ => Err(UnknownDataKind(s.to_string())),
        }
    }
}

/// A datatype tag that is not one of the supported datatypes.
#[derive(Debug, Clone, Error)]
#[error("unknown datatype `{0}`")]
pub struct UnknownDataKind(pub String);

/// One completed operation: method, value and the half-open real-time
/// interval `[start, end)` it occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub id: OpId,
    pub method: Method,
    pub value: Value,
    pub start: Time,
    pub end: Time,
}

impl Operation {
    #[must_use]
    pub fn new(id: OpId, method: Method, value: Value, start: Time, end: Time) -> Self {
        debug_assert!(start < end, "operation must span a non-empty interval");
        Self {
            id,
            method,
            value,
            start,
            end,
        }
    }

    /// Whether this operation observed the structure as empty.
    #[must_use]
    pub fn is_empty_observation(&self, empty_val: Value) -> bool {
        self.value == empty_val
    }
}

/// A multiset of completed operations.
///
/// Owned and mutated by the monitor pipeline: extension may append
/// synthesized removes, tuning rewrites timestamps, and the empty-strip
/// stage drops empty-observation operations.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub ops: Vec<Operation>,
}

impl History {
    #[must_use]
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The largest operation id present, or 0 for an empty history.
    #[must_use]
    pub fn max_id(&self) -> OpId {
        self.ops.iter().map(|o| o.id).max().unwrap_or(0)
    }

    /// Drop every empty-observation operation.
    pub fn retain_real(&mut self, empty_val: Value) {
        self.ops.retain(|o| !o.is_empty_observation(empty_val));
    }
}

impl FromIterator<Operation> for History {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}
