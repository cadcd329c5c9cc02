//! Test utilities for dispatch tests.

pub mod scripted_adapter;

#[allow(unused_imports)]
pub use scripted_adapter::{CallRecord, ScriptedAdapter, ScriptedFactory, Step};
