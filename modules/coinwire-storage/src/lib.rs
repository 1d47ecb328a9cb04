//! Versioned multi-store persistence.
//!
//! Three backends implement one [`Strategy`] contract; the [`Service`]
//! facade fans writes out to all of them and fans reads in across them,
//! with `NotImplemented` as a first-class skip signal.

pub mod elastic;
pub mod error;
pub mod mysql;
pub mod redis;
pub mod service;
pub mod strategy;

pub use error::{FanoutError, Result, StorageError};
pub use service::{version_listener, Service, VersionNotifier};
pub use strategy::Strategy;
