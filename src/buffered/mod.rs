//! Per-image write buffering and pre-frame command deferral.

pub(crate) mod image;
/// Pre-frame command capture and replay.
pub mod queue;
/// Disposable shader handles.
pub mod shader;
