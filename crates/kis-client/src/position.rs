//! GPS positions: the latest fix and historical tracks

use chrono::NaiveDateTime;
use kis_auth::Result;
use serde::{Deserialize, Serialize};

use crate::client::KisClient;
use crate::lookup::{DateRange, Lookup, Query};

/// A single position report from a machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(rename = "MachineUUID")]
    pub machine_uuid: String,
    #[serde(rename = "StatusName", skip_serializing_if = "Option::is_none")]
    pub status_name: Option<String>,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// Absent when the telematics unit reported no speed.
    #[serde(rename = "Speed", skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(rename = "Timestamp", with = "crate::time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "CreateTime", with = "crate::time::option")]
    pub create_time: Option<NaiveDateTime>,
}

impl KisClient {
    /// Most recent position, or `None` if the machine has not reported yet.
    pub async fn last_position(
        &self,
        lookup: &Lookup,
        subscription: Option<&str>,
    ) -> Result<Option<Position>> {
        let query = Query::new(lookup.param()).subscription(subscription);
        self.get("position", query).await
    }

    /// Positions reported within `range`.
    pub async fn historical_positions(
        &self,
        lookup: &Lookup,
        subscription: Option<&str>,
        range: DateRange,
    ) -> Result<Vec<Position>> {
        let query = Query::new(lookup.param())
            .subscription(subscription)
            .range(range);
        let positions: Option<Vec<Position>> = self.get("position", query).await?;
        Ok(positions.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{connected, envelope};
    use chrono::NaiveDate;
    use wiremock::Mock;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};

    fn jan15(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 30, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn last_position_decodes_optional_speed() {
        let (server, client) = connected().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/position"))
            .and(query_param("machineUUID", "m-1"))
            .and(query_param_is_missing("startDate"))
            .respond_with(envelope(
                "position",
                serde_json::json!({
                    "MachineUUID": "m-1",
                    "Latitude": 52.52,
                    "Longitude": 13.405,
                    "Timestamp": "2024-01-15T09:30:00"
                }),
            ))
            .mount(&server)
            .await;

        let position = client
            .last_position(&Lookup::machine_uuid("m-1"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.latitude, 52.52);
        assert_eq!(position.speed, None);
        assert_eq!(position.status_name, None);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn last_position_null_payload_is_none() {
        let (server, client) = connected().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/position"))
            .respond_with(envelope("position", serde_json::Value::Null))
            .mount(&server)
            .await;

        let position = client
            .last_position(&Lookup::user_name("ann"), None)
            .await
            .unwrap();
        assert!(position.is_none());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn historical_positions_send_date_range() {
        let (server, client) = connected().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/position"))
            .and(query_param("machineUUID", "m-1"))
            .and(query_param("startDate", "2024-01-15T08:30:00"))
            .and(query_param("endDate", "2024-01-15T09:30:00"))
            .respond_with(envelope(
                "position",
                serde_json::json!([
                    {"MachineUUID": "m-1", "Latitude": 1.0, "Longitude": 2.0, "Speed": 12.5},
                    {"MachineUUID": "m-1", "Latitude": 1.1, "Longitude": 2.1, "StatusName": "working"}
                ]),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let positions = client
            .historical_positions(
                &Lookup::machine_uuid("m-1"),
                None,
                DateRange::between(jan15(8), jan15(9)),
            )
            .await
            .unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].speed, Some(12.5));
        assert_eq!(positions[1].status_name.as_deref(), Some("working"));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn historical_positions_omit_unset_bounds() {
        let (server, client) = connected().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/position"))
            .and(query_param("startDate", "2024-01-15T08:30:00"))
            .and(query_param_is_missing("endDate"))
            .respond_with(envelope("position", serde_json::Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let positions = client
            .historical_positions(&Lookup::user_name("ann"), None, DateRange::since(jan15(8)))
            .await
            .unwrap();
        assert!(positions.is_empty());
        client.shutdown().await;
    }
}
