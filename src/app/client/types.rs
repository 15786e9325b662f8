//! Wire types of the RustMaps API
//!
//! Every response is wrapped in a `{meta, data}` envelope. Fields the client
//! does not rely on default when absent so that additions on the service side
//! do not break decoding. An explicit `null` is read the same way as an absent
//! field; error envelopes carry `"data": null`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::app::models::{MapRequest, Status};

/// Response metadata common to every endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseMeta {
    pub status: String,
    pub status_code: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

/// Generic `{meta, data}` envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: ResponseMeta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: T,
}

/// Decode `null` as the type's default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload returned by the submission endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateData {
    pub map_id: String,
    pub queue_position: i64,
    pub state: String,
    pub current_step: String,
    pub last_generator_ping_utc: Option<String>,
}

/// Submission response
pub type GenerateResponse = Envelope<GenerateData>;

/// Body of a procedural submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceduralBody {
    pub size: u32,
    pub seed: String,
    pub staging: bool,
}

/// Body of a custom (saved config) submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBody {
    pub map_parameters: ProceduralBody,
    pub config_name: String,
}

impl From<&MapRequest> for ProceduralBody {
    fn from(request: &MapRequest) -> Self {
        Self {
            size: request.size,
            seed: request.seed.clone(),
            staging: request.staging,
        }
    }
}

impl From<&MapRequest> for CustomBody {
    fn from(request: &MapRequest) -> Self {
        Self {
            map_parameters: ProceduralBody::from(request),
            config_name: request.saved_config.clone(),
        }
    }
}

/// Map coordinates of a monument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

/// A monument placed on a generated map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Monument {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Coordinates,
    pub name_override: Option<String>,
}

/// Share of the map covered by each biome
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomePercentages {
    /// Snow
    pub s: f64,
    /// Desert
    pub d: f64,
    /// Forest
    pub f: f64,
    /// Tundra
    pub t: f64,
    /// Jungle
    pub j: f64,
}

/// Full status payload of a generated map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusData {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub seed: i64,
    pub size: u32,
    pub save_version: i64,
    pub url: String,
    pub raw_image_url: String,
    pub image_url: String,
    pub image_icon_url: String,
    pub thumbnail_url: String,
    pub is_staging: bool,
    pub is_custom_map: bool,
    pub can_download: bool,
    pub download_url: String,
    pub total_monuments: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub monuments: Vec<Monument>,
    pub land_percentage_of_map: u32,
    pub biome_percentages: BiomePercentages,
    pub islands: u32,
    pub mountains: u32,
    pub ice_lakes: u32,
    pub rivers: u32,
    pub lakes: u32,
    pub canyons: u32,
    pub oases: u32,
    pub buildable_rocks: u32,
}

/// Status endpoint response
pub type StatusResponse = Envelope<StatusData>;

/// Result of a status lookup: the mapped status plus the payload on success
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: Status,
    pub data: Option<StatusData>,
}

impl StatusReport {
    /// A report carrying no payload
    pub fn bare(status: Status) -> Self {
        Self { status, data: None }
    }

    /// A complete report with its payload
    pub fn complete(data: StatusData) -> Self {
        Self {
            status: Status::Complete,
            data: Some(data),
        }
    }

    /// Whether the service says the map file can be downloaded
    pub fn can_download(&self) -> bool {
        self.data.as_ref().is_some_and(|data| data.can_download)
    }
}

/// Current and allowed usage for one limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub current: u32,
    pub allowed: u32,
}

/// Payload of the limits endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsData {
    pub concurrent: Usage,
    pub monthly: Usage,
}

/// Limits endpoint response
pub type LimitsResponse = Envelope<LimitsData>;

/// Account quota at one point in time
///
/// Fetched fresh when needed and never cached beyond one orchestration tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub concurrent_current: u32,
    pub concurrent_allowed: u32,
    pub monthly_current: u32,
    pub monthly_allowed: u32,
}

impl QuotaSnapshot {
    /// No more generations may run at the same time
    pub fn concurrent_reached(&self) -> bool {
        self.concurrent_current >= self.concurrent_allowed
    }

    /// The monthly allowance is used up
    pub fn monthly_reached(&self) -> bool {
        self.monthly_current >= self.monthly_allowed
    }

    /// Whether a new submission is allowed
    pub fn can_generate(&self) -> bool {
        !self.concurrent_reached() && !self.monthly_reached()
    }

    /// Submissions possible before either limit is reached
    pub fn headroom(&self) -> u32 {
        let concurrent = self
            .concurrent_allowed
            .saturating_sub(self.concurrent_current);
        let monthly = self.monthly_allowed.saturating_sub(self.monthly_current);
        concurrent.min(monthly)
    }
}

impl From<LimitsData> for QuotaSnapshot {
    fn from(data: LimitsData) -> Self {
        Self {
            concurrent_current: data.concurrent.current,
            concurrent_allowed: data.concurrent.allowed,
            monthly_current: data.monthly.current,
            monthly_allowed: data.monthly.allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_body_shape() {
        let request = MapRequest::new("123", 4000, "myconfig", true);
        let json = serde_json::to_value(CustomBody::from(&request)).unwrap();
        assert_eq!(json["configName"], "myconfig");
        assert_eq!(json["mapParameters"]["seed"], "123");
        assert_eq!(json["mapParameters"]["size"], 4000);
        assert_eq!(json["mapParameters"]["staging"], true);
    }

    #[test]
    fn test_status_response_decoding() {
        let body = r#"{
            "meta": {"status": "Success", "statusCode": 200, "errors": []},
            "data": {
                "id": "abc",
                "seed": 123,
                "size": 4000,
                "url": "https://rustmaps.com/map/abc",
                "imageUrl": "https://cdn/abc.png",
                "imageIconUrl": "https://cdn/abc_icons.png",
                "thumbnailUrl": "https://cdn/abc_thumb.png",
                "canDownload": true,
                "downloadUrl": "https://cdn/abc.map",
                "monuments": [{"type": "Lighthouse", "coordinates": {"x": 1, "y": -2}}],
                "biomePercentages": {"s": 10.5, "d": 20.0, "f": 30.0, "t": 25.0, "j": 14.5},
                "rivers": 3
            }
        }"#;

        let response: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.meta.status_code, 200);
        assert_eq!(response.data.id, "abc");
        assert!(response.data.can_download);
        assert_eq!(response.data.monuments[0].kind, "Lighthouse");
        assert_eq!(response.data.monuments[0].coordinates.y, -2);
        assert_eq!(response.data.rivers, 3);
        assert_eq!(response.data.lakes, 0);
    }

    #[test]
    fn test_null_data_decodes_as_default() {
        let body = r#"{"meta":{"status":"Error","statusCode":400,"errors":["Staging is not enabled"]},"data":null}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.meta.errors, vec!["Staging is not enabled"]);
        assert_eq!(response.data, GenerateData::default());

        let body = r#"{"meta":null,"data":{"concurrent":{"current":1,"allowed":5}}}"#;
        let response: LimitsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.meta, ResponseMeta::default());
        assert_eq!(response.data.concurrent.allowed, 5);
        assert_eq!(response.data.monthly, Usage::default());

        let body = r#"{"meta":{"errors":null},"data":{"id":"abc","monuments":null}}"#;
        let response: StatusResponse = serde_json::from_str(body).unwrap();
        assert!(response.meta.errors.is_empty());
        assert!(response.data.monuments.is_empty());
    }

    #[test]
    fn test_quota_snapshot_gating() {
        let open = QuotaSnapshot {
            concurrent_current: 0,
            concurrent_allowed: 3,
            monthly_current: 10,
            monthly_allowed: 250,
        };
        assert!(open.can_generate());
        assert_eq!(open.headroom(), 3);

        let concurrent_full = QuotaSnapshot {
            concurrent_current: 3,
            ..open
        };
        assert!(concurrent_full.concurrent_reached());
        assert!(!concurrent_full.can_generate());
        assert_eq!(concurrent_full.headroom(), 0);

        let monthly_full = QuotaSnapshot {
            monthly_current: 250,
            ..open
        };
        assert!(monthly_full.monthly_reached());
        assert!(!monthly_full.can_generate());
    }

    #[test]
    fn test_report_can_download() {
        assert!(!StatusReport::bare(Status::NotFound).can_download());
        let data = StatusData {
            can_download: true,
            ..Default::default()
        };
        assert!(StatusReport::complete(data).can_download());
    }
}
