//! Machine master data

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{Lookup, Query};

/// A machine as registered with KIS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Machine {
    #[serde(rename = "MachineUUID")]
    pub machine_uuid: String,
    #[serde(rename = "CompanyID")]
    pub company_id: String,
    #[serde(rename = "MachineName")]
    pub machine_name: String,
    #[serde(rename = "FleetID")]
    pub fleet_id: String,
    #[serde(rename = "EquipmentID")]
    pub equipment_id: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Type")]
    pub machine_type: String,
    #[serde(rename = "DeviceSerialNumber")]
    pub device_serial_number: String,
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
    /// Machine record for a phone number, user name, or machine UUID.
    pub async fn machine(&self, lookup: &Lookup, subscription: Option<&str>) -> Result<Machine> {
        let query = Query::new(lookup.param()).subscription(subscription);
        self.get("machine", query).await
    }
}
