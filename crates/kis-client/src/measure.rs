//! Sensor measure history (engine hours, fuel level, ...)

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{DateRange, Lookup, Query};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measure {
    #[serde(rename = "MachineUUID")]
    pub machine_uuid: String,
    #[serde(rename = "MeasureName")]
    pub measure_name: String,
    #[serde(rename = "MeasureUnit")]
    pub measure_unit: String,
    #[serde(rename = "MeasureValue")]
    pub measure_value: f64,
    #[serde(rename = "Timestamp", with = "crate::time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "CreateTime", with = "crate::time::option")]
    pub create_time: Option<NaiveDateTime>,
}

impl KisClient {
    /// Measures recorded within `range`.
    pub async fn historical_measures(
        &self,
        lookup: &Lookup,
        subscription: Option<&str>,
        range: DateRange,
    ) -> Result<Vec<Measure>> {
        let query = Query::new(lookup.param())
            .subscription(subscription)
            .range(range);
        let measures: Option<Vec<Measure>> = self.get("measure", query).await?;
        Ok(measures.unwrap_or_default())
    }
}
