//! Typed lookups against the KIS machine-telemetry API
//!
//! `KisClient` wraps a shared `CredentialManager` and exposes one method per
//! resource query. Each call reads the current bearer token (never waiting on
//! a refresh), issues a GET, and decodes the `{Status, Resource, Payload}`
//! envelope into a typed record.
//!
//! Resources and their lookup keys:
//! - machine, last/historical position, alarm, measure, registry: by mobile
//!   phone, user name, or machine UUID (`Lookup`)
//! - field, user: by mobile phone or user name (`AccountLookup`)
//!
//! Historical queries take a `DateRange`; unset bounds are left out of the
//! query string.

pub mod alarm;
pub mod client;
pub mod field;
pub mod lookup;
pub mod machine;
pub mod measure;
pub mod position;
pub mod registry;
pub mod time;
pub mod user;

pub use alarm::Alarm;
pub use client::{ClientConfig, KisClient};
pub use field::{Field, Shape};
pub use kis_auth::{ApiError, AuthConfig, CredentialManager, Error, RefreshEvent, Result};
pub use lookup::{AccountLookup, DateRange, Lookup};
pub use machine::Machine;
pub use measure::Measure;
pub use position::Position;
pub use registry::Registry;
pub use user::User;
