//! Serde support for `Duration` values written as humantime strings.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Foo {
//!     #[serde(with = "dc_microservice::humantime_serde")]
//!     timeout: Duration,
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer, de};

/// Serializes a `Duration` as a humantime string (e.g. `"3s"`).
///
/// # Errors
/// Returns the serializer's error if writing the string fails.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_str(&humantime::format_duration(*d))
}

/// Deserializes a `Duration` from a humantime string (e.g. `"500ms"`, `"1m 30s"`).
///
/// # Errors
/// Returns a custom deserializer error if the string is not a valid duration.
pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    humantime::parse_duration(&raw).map_err(de::Error::custom)
}
