//! JSON operation scripts replayed through a [`crate::Graphics`] session.

/// Serde model of a script.
pub mod model;
/// Script execution.
pub mod run;

#[cfg(test)]
#[path = "../../tests/unit/script/mod.rs"]
mod tests;
