//! Field boundaries owned by an account

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{AccountLookup, Query};

/// A farmed field with its GeoJSON outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    #[serde(rename = "FieldID")]
    pub field_id: String,
    #[serde(rename = "CompanyID")]
    pub company_id: String,
    #[serde(rename = "FieldName")]
    pub field_name: String,
    #[serde(rename = "Shape")]
    pub shape: Shape,
    #[serde(rename = "FieldStatus")]
    pub field_status: String,
    #[serde(rename = "Timestamp", with = "crate::time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "CreateTime", with = "crate::time::option")]
    pub create_time: Option<NaiveDateTime>,
    #[serde(rename = "UpdateTime", with = "crate::time::option")]
    pub update_time: Option<NaiveDateTime>,
}

/// GeoJSON polygon. Unlike the rest of the API, keys are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shape {
    #[serde(rename = "type")]
    pub shape_type: String,
    /// Rings of `[longitude, latitude]` pairs.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl KisClient {
    /// All fields belonging to the account.
    pub async fn fields(&self, lookup: &AccountLookup) -> Result<Vec<Field>> {
        let fields: Option<Vec<Field>> = self.get("field", Query::new(lookup.param())).await?;
        Ok(fields.unwrap_or_default())
    }
}
