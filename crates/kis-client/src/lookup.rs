//! Lookup keys and query parameters
//!
//! Every KIS resource is addressed by exactly one identifying key, sent as a
//! query parameter (`mobilePhone`, `userName`, or `machineUUID`). Machine-level
//! resources also take an optional `subscription` and, for history, a date
//! range.

use chrono::NaiveDateTime;

use crate::time;

/// Key for machine-level resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    MobilePhone(String),
    UserName(String),
    MachineUuid(String),
}

impl Lookup {
    pub fn mobile_phone(value: impl Into<String>) -> Self {
        Self::MobilePhone(value.into())
    }

    pub fn user_name(value: impl Into<String>) -> Self {
        Self::UserName(value.into())
    }

    pub fn machine_uuid(value: impl Into<String>) -> Self {
        Self::MachineUuid(value.into())
    }

    /// Query parameter name and value.
    pub fn param(&self) -> (&'static str, &str) {
        match self {
            Lookup::MobilePhone(v) => ("mobilePhone", v),
            Lookup::UserName(v) => ("userName", v),
            Lookup::MachineUuid(v) => ("machineUUID", v),
        }
    }
}

/// Key for account-level resources (fields, users).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLookup {
    MobilePhone(String),
    UserName(String),
}

impl AccountLookup {
    pub fn mobile_phone(value: impl Into<String>) -> Self {
        Self::MobilePhone(value.into())
    }

    pub fn user_name(value: impl Into<String>) -> Self {
        Self::UserName(value.into())
    }

    pub fn param(&self) -> (&'static str, &str) {
        match self {
            AccountLookup::MobilePhone(v) => ("mobilePhone", v),
            AccountLookup::UserName(v) => ("userName", v),
        }
    }
}

impl From<AccountLookup> for Lookup {
    fn from(value: AccountLookup) -> Self {
        match value {
            AccountLookup::MobilePhone(v) => Lookup::MobilePhone(v),
            AccountLookup::UserName(v) => Lookup::UserName(v),
        }
    }
}

/// Time window for historical queries. Unset bounds are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: NaiveDateTime) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// The last `window` up to now (UTC).
    pub fn last(window: chrono::Duration) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self::between(now - window, now)
    }
}

/// Query string parameters in insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Query(Vec<(&'static str, String)>);

impl Query {
    pub fn new((name, value): (&'static str, &str)) -> Self {
        Self(vec![(name, value.to_owned())])
    }

    /// Add `subscription` unless absent or empty.
    pub fn subscription(mut self, subscription: Option<&str>) -> Self {
        if let Some(s) = subscription.filter(|s| !s.is_empty()) {
            self.0.push(("subscription", s.to_owned()));
        }
        self
    }

    /// Add `startDate`/`endDate` for the bounds that are set.
    pub fn range(mut self, range: DateRange) -> Self {
        if let Some(start) = time::encode(range.start) {
            self.0.push(("startDate", start));
        }
        if let Some(end) = time::encode(range.end) {
            self.0.push(("endDate", end));
        }
        self
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }
}
