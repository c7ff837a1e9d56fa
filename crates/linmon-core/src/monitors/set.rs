//! Set monitor: constant-structure envelope check.
//!
//! After extension, value `v` is provably in the set over the window
//! `(minResponse(v), maxInvocation(v))` taken across every operation on
//! `v` except `contains_false`. A history is linearizable iff every
//! insert starts no later than `minResponse`, every remove ends no
//! earlier than `maxInvocation`, and no `contains_false` is strictly
//! nested inside the window.

use std::collections::HashMap;

use crate::frontend::extend_history;
use crate::history::{DataKind, History, Method, Time, Value};

pub fn is_linearizable(hist: &mut History, empty_val: Value) -> bool {
    if hist.is_empty() {
        return true;
    }
    if !extend_history(hist, DataKind::Set, empty_val) {
        return false;
    }

    // (min response, max invocation) per value, contains_false excluded.
    let mut envelopes: HashMap<Value, (Time, Time)> = HashMap::with_capacity(hist.len());
    for o in &hist.ops {
        if o.method != Method::ContainsFalse {
            let env = envelopes.entry(o.value).or_insert((Time::MAX, 0));
            env.0 = env.0.min(o.end);
            env.1 = env.1.max(o.start);
        }
    }

    for o in &hist.ops {
        let Some(&(min_res, max_inv)) = envelopes.get(&o.value) else {
            // Only contains_false observed this value; unconstrained.
            continue;
        };
        if o.method != Method::ContainsFalse {
            if o.method == Method::Insert && o.start > min_res {
                return false;
            }
            if o.method == Method::Remove && o.end < max_inv {
                return false;
            }
        } else if min_res < o.start && o.end < max_inv {
            return false;
        }
    }

    true
}

/// Without peek-style methods only the insert bound matters: each insert
/// must start no later than the earliest response on its value.
pub fn is_linearizable_no_peeks(hist: &mut History, empty_val: Value) -> bool {
    if hist.is_empty() {
        return true;
    }
    if !extend_history(hist, DataKind::Set, empty_val) {
        return false;
    }

    let mut min_response: HashMap<Value, Time> = HashMap::with_capacity(hist.len());
    for o in &hist.ops {
        let env = min_response.entry(o.value).or_insert(Time::MAX);
        *env = (*env).min(o.end);
    }

    hist.ops
        .iter()
        .all(|o| o.method != Method::Insert || o.start <= min_response[&o.value])
}
