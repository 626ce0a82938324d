//! Alarm history

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{DateRange, Lookup, Query};

/// An alarm raised by a machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alarm {
    #[serde(rename = "MachineUUID")]
    pub machine_uuid: String,
    #[serde(rename = "Type")]
    pub alarm_type: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Timestamp", with = "crate::time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "CreateTime", with = "crate::time::option")]
    pub create_time: Option<NaiveDateTime>,
}

impl KisClient {
    /// Alarms raised within `range`.
    pub async fn historical_alarms(
        &self,
        lookup: &Lookup,
        subscription: Option<&str>,
        range: DateRange,
    ) -> Result<Vec<Alarm>> {
        let query = Query::new(lookup.param())
            .subscription(subscription)
            .range(range);
        let alarms: Option<Vec<Alarm>> = self.get("alarm", query).await?;
        Ok(alarms.unwrap_or_default())
    }
}
