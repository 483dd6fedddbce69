//! Global subscriber installation. Kept in its own test binary so the
//! subscriber it installs never leaks into the unit tests.

use rosbridge_core::logging::{init_json_subscriber, init_subscriber};

#[test]
fn repeated_init_is_a_no_op() {
    init_subscriber("warn");
    init_subscriber("debug");
    init_json_subscriber("info");
    tracing::debug!("subscriber installed");
}
