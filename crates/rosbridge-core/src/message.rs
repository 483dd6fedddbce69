//! Contract for typed ROS messages.
//!
//! Generated message types implement [`RosMessage`]. `parse` must accept
//! whatever `to_json` produces, so that `parse(m.to_json())` on a fresh
//! instance yields a value equal to `m`. Equality between messages is
//! equality of their JSON form, see [`json_eq`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A message type that round-trips through JSON.
pub trait RosMessage {
    /// Short type name, e.g. `"String"`.
    fn type_name(&self) -> &'static str;

    /// Package the type lives in, `None` for builtins.
    fn package_name(&self) -> Option<&'static str>;

    /// `"<package>/<type>"`, or just the type name for builtins.
    fn full_type_name(&self) -> String {
        match self.package_name() {
            Some(pkg) => format!("{pkg}/{}", self.type_name()),
            None => self.type_name().to_owned(),
        }
    }

    /// Populate `self` from `value`. Returns `false` on a shape mismatch
    /// without panicking; `self` may be partially updated in that case.
    fn parse(&mut self, value: &Value) -> bool;

    /// JSON form of the message.
    fn to_json(&self) -> Value;
}

/// Value equality as defined by the message contract.
pub fn json_eq<A, B>(a: &A, b: &B) -> bool
where
    A: RosMessage + ?Sized,
    B: RosMessage + ?Sized,
{
    a.to_json() == b.to_json()
}

fn field_u32(value: &Value, name: &str) -> Option<u32> {
    value.get(name)?.as_u64()?.try_into().ok()
}

fn field_i32(value: &Value, name: &str) -> Option<i32> {
    value.get(name)?.as_i64()?.try_into().ok()
}

/// Builtin `time`: seconds and nanoseconds since the epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    /// Whole seconds.
    pub secs: u32,
    /// Nanoseconds past `secs`.
    pub nsecs: u32,
}

impl Time {
    /// Construct from parts.
    pub fn new(secs: u32, nsecs: u32) -> Self {
        Self { secs, nsecs }
    }
}

impl RosMessage for Time {
    fn type_name(&self) -> &'static str {
        "time"
    }

    fn package_name(&self) -> Option<&'static str> {
        None
    }

    fn parse(&mut self, value: &Value) -> bool {
        match (field_u32(value, "secs"), field_u32(value, "nsecs")) {
            (Some(secs), Some(nsecs)) => {
                *self = Self { secs, nsecs };
                true
            }
            _ => false,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "secs": self.secs, "nsecs": self.nsecs })
    }
}

/// Builtin `duration`: signed seconds and nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration {
    /// Whole seconds.
    pub secs: i32,
    /// Nanoseconds past `secs`.
    pub nsecs: i32,
}

impl Duration {
    /// Construct from parts.
    pub fn new(secs: i32, nsecs: i32) -> Self {
        Self { secs, nsecs }
    }
}

impl RosMessage for Duration {
    fn type_name(&self) -> &'static str {
        "duration"
    }

    fn package_name(&self) -> Option<&'static str> {
        None
    }

    fn parse(&mut self, value: &Value) -> bool {
        match (field_i32(value, "secs"), field_i32(value, "nsecs")) {
            (Some(secs), Some(nsecs)) => {
                *self = Self { secs, nsecs };
                true
            }
            _ => false,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "secs": self.secs, "nsecs": self.nsecs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trips() {
        let t = Time::new(1_700_000_000, 42);
        let mut fresh = Time::default();
        assert!(fresh.parse(&t.to_json()));
        assert_eq!(fresh, t);
        assert!(json_eq(&fresh, &t));
    }

    #[test]
    fn time_rejects_wrong_shape() {
        let mut t = Time::default();
        assert!(!t.parse(&json!({"secs": "soon"})));
        assert!(!t.parse(&json!([1, 2])));
        assert!(!t.parse(&json!({"secs": -1, "nsecs": 0})));
        assert_eq!(t, Time::default());
    }

    #[test]
    fn duration_accepts_negative() {
        let mut d = Duration::default();
        assert!(d.parse(&json!({"secs": -3, "nsecs": 500})));
        assert_eq!(d, Duration::new(-3, 500));
    }

    #[test]
    fn builtin_type_names() {
        assert_eq!(Time::default().full_type_name(), "time");
        assert_eq!(Duration::default().full_type_name(), "duration");
    }

    #[test]
    fn json_eq_ignores_rust_type() {
        assert!(json_eq(&Time::new(1, 2), &Duration::new(1, 2)));
        assert!(!json_eq(&Time::new(1, 2), &Time::new(1, 3)));
    }
}
