#![allow(dead_code)] // Each integration test binary uses a different subset.

pub mod listeners;
pub mod scopes;
