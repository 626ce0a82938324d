//! Account user profiles

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{AccountLookup, Query};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "MobilePhone")]
    pub mobile_phone: String,
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "CompanyID")]
    pub company_id: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "UserStatus")]
    pub user_status: String,
    #[serde(rename = "Timestamp", with = "crate::time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "CreateTime", with = "crate::time::option")]
    pub create_time: Option<NaiveDateTime>,
    #[serde(rename = "UpdateTime", with = "crate::time::option")]
    pub update_time: Option<NaiveDateTime>,
}

impl KisClient {
    pub async fn user(&self, lookup: &AccountLookup) -> Result<User> {
        self.get("user", Query::new(lookup.param())).await
    }
}
