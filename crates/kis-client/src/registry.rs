//! Subscription registry entries

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{Lookup, Query};

/// Links a machine to its telematics subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registry {
    #[serde(rename = "SubscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "MachineUUID")]
    pub machine_uuid: String,
    #[serde(rename = "ServiceLevel")]
    pub service_level: String,
    #[serde(rename = "SubscriptionStart")]
    pub subscription_start: String,
    #[serde(rename = "SubscriptionEnd")]
    pub subscription_end: String,
    #[serde(rename = "Timestamp", with = "crate::time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "CreateTime", with = "crate::time::option")]
    pub create_time: Option<NaiveDateTime>,
    #[serde(rename = "UpdateTime", with = "crate::time::option")]
    pub update_time: Option<NaiveDateTime>,
}

impl KisClient {
    pub async fn registry(&self, lookup: &Lookup, subscription: Option<&str>) -> Result<Registry> {
        let query = Query::new(lookup.param()).subscription(subscription);
        self.get("registry", query).await
    }
}
