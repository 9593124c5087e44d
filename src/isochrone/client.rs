//! Routing-service client for isochrone requests.

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::geojson::decode_isochrones;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::models::CumulativeIsochrone;

pub const DEFAULT_ROUTER: &str = "default";

/// A travel mode advertised by the router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TravelOption {
    /// Caller-facing label, e.g. `"Walk"`
    pub name: String,
    /// Token sent as `mode`, e.g. `"WALK"` or `"TRANSIT,WALK"`
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouterInfo {
    #[serde(default)]
    travel_options: Vec<TravelOption>,
}

#[derive(Debug, Clone)]
pub struct IsochroneRequest {
    pub lat: f64,
    pub lon: f64,
    pub cutoffs: Vec<u32>,
    pub date_time: NaiveDateTime,
    /// Mode label as advertised in `travelOptions`
    pub mode: String,
    /// Cycling speed in km/h; only sent for cycling modes.
    pub bike_speed_kmh: Option<f64>,
}

impl IsochroneRequest {
    pub fn new(
        lat: f64,
        lon: f64,
        cutoffs: Vec<u32>,
        date_time: NaiveDateTime,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            lat,
            lon,
            cutoffs,
            date_time,
            mode: mode.into(),
            bike_speed_kmh: None,
        }
    }

    pub fn with_bike_speed(mut self, kmh: f64) -> Self {
        self.bike_speed_kmh = Some(kmh);
        self
    }

    fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::InvalidRequest(format!(
                "origin ({}, {}) is not a valid latitude/longitude",
                self.lat, self.lon
            )));
        }
        if self.cutoffs.is_empty() {
            return Err(Error::InvalidRequest("at least one cutoff is required".into()));
        }
        if self.cutoffs.contains(&0) {
            return Err(Error::InvalidRequest("cutoffs must be positive".into()));
        }
        if let Some(speed) = self.bike_speed_kmh {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(Error::InvalidRequest(format!("invalid bike speed {}", speed)));
            }
        }
        Ok(())
    }

    /// Query parameters for the isochrone endpoint, given the resolved mode token.
    fn query(&self, mode_token: &str) -> Vec<(String, String)> {
        let place = format!("{},{}", self.lat, self.lon);
        let mut query = vec![
            ("fromPlace".to_string(), place.clone()),
            ("toPlace".to_string(), place),
            ("date".to_string(), self.date_time.format("%m-%d-%Y").to_string()),
            ("time".to_string(), self.date_time.format("%I:%M%p").to_string()),
        ];
        for cutoff in &self.cutoffs {
            query.push(("cutoffSec".to_string(), cutoff.to_string()));
        }
        query.push(("mode".to_string(), mode_token.to_string()));
        query.push(("arriveBy".to_string(), "false".to_string()));

        if let Some(kmh) = self.bike_speed_kmh {
            if mode_token.to_ascii_uppercase().contains("BICYCLE") {
                query.push(("bikeSpeed".to_string(), (kmh / 3.6).to_string()));
            }
        }
        query
    }
}

/// Client for an OpenTripPlanner-style router.
pub struct RoutingClient<H> {
    http: H,
    base_url: String,
    router: String,
    api_key: Option<String>,
}

impl<H: HttpClient> RoutingClient<H> {
    pub fn new(http: H, base_url: &str) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            router: DEFAULT_ROUTER.to_string(),
            api_key: None,
        })
    }

    pub fn with_router(mut self, router: impl Into<String>) -> Self {
        self.router = router.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn router_url(&self) -> String {
        format!("{}/routers/{}", self.base_url, self.router)
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.api_key
            .iter()
            .map(|key| ("x-api-key".to_string(), key.clone()))
            .collect()
    }

    /// Travel modes advertised by the router, in server order.
    pub fn available_modes(&self) -> Result<Vec<TravelOption>> {
        let body = self
            .http
            .get(&self.router_url(), &[], &self.headers())?
            .into_success()?;
        let info: RouterInfo = serde_json::from_str(&body)?;
        debug!("Router advertises {} travel options", info.travel_options.len());
        Ok(info.travel_options)
    }

    /// Map a mode label to the router's token.
    pub fn resolve_mode(&self, label: &str) -> Result<String> {
        let options = self.available_modes()?;
        match options.iter().find(|o| o.name == label) {
            Some(option) => Ok(option.value.clone()),
            None => Err(Error::UnsupportedMode {
                requested: label.to_string(),
                available: options.into_iter().map(|o| o.name).collect(),
            }),
        }
    }

    /// Cumulative isochrones for `request`, sorted by ascending cutoff.
    ///
    /// The mode is checked against the router before the isochrone request is sent.
    pub fn calculate_isochrones(
        &self,
        request: &IsochroneRequest,
    ) -> Result<Vec<CumulativeIsochrone>> {
        request.validate()?;
        let token = self.resolve_mode(&request.mode)?;

        info!(
            "Requesting {} isochrones ({}) from ({}, {})",
            request.cutoffs.len(),
            token,
            request.lat,
            request.lon
        );
        let url = format!("{}/isochrone", self.router_url());
        let body = self
            .http
            .get(&url, &request.query(&token), &self.headers())?
            .into_success()?;

        let mut isochrones = decode_isochrones(&body)?;
        isochrones.sort_by_key(|iso| iso.cutoff_sec);
        Ok(isochrones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttp;
    use chrono::NaiveDate;

    const ROUTER: &str = r#"{
        "routerId": "default",
        "travelOptions": [
            {"value": "WALK", "name": "Walk"},
            {"value": "BICYCLE", "name": "Bike"}
        ]
    }"#;

    const ISOCHRONES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"time": 1200},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0],[4,0],[4,4],[0,4],[0,0]]]]}},
            {"type": "Feature", "properties": {"time": 600},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[1,1],[2,1],[2,2],[1,2],[1,1]]]]}}
        ]
    }"#;

    fn mock() -> MockHttp {
        MockHttp::new()
            .route("/routers/default", 200, ROUTER)
            .route("/routers/default/isochrone", 200, ISOCHRONES)
    }

    fn request(mode: &str) -> IsochroneRequest {
        let date_time = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        IsochroneRequest::new(46.2, 6.14, vec![600, 1200], date_time, mode)
    }

    #[test]
    fn test_resolve_mode() {
        let http = mock();
        let client = RoutingClient::new(&http, "http://localhost:8080/otp").unwrap();
        assert_eq!(client.resolve_mode("Walk").unwrap(), "WALK");
        assert_eq!(client.resolve_mode("Bike").unwrap(), "BICYCLE");
    }

    #[test]
    fn test_unknown_mode_lists_alternatives() {
        let http = mock();
        let client = RoutingClient::new(&http, "http://localhost:8080/otp").unwrap();

        let err = client.calculate_isochrones(&request("Car")).unwrap_err();
        match &err {
            Error::UnsupportedMode { requested, available } => {
                assert_eq!(requested, "Car");
                assert_eq!(available, &vec!["Walk".to_string(), "Bike".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains(r#"["Walk", "Bike"]"#));
        // Only the mode lookup went out.
        assert_eq!(http.request_count(), 1);
    }

    #[test]
    fn test_isochrone_request_parameters() {
        let http = mock();
        let client = RoutingClient::new(&http, "http://localhost:8080/otp/")
            .unwrap()
            .with_api_key(Some("secret".into()));

        let isochrones = client
            .calculate_isochrones(&request("Bike").with_bike_speed(18.0))
            .unwrap();
        let cutoffs: Vec<u32> = isochrones.iter().map(|i| i.cutoff_sec).collect();
        assert_eq!(cutoffs, vec![600, 1200]);

        let requests = http.requests.borrow();
        assert_eq!(requests.len(), 2);
        let iso = &requests[1];
        assert_eq!(iso.url, "http://localhost:8080/otp/routers/default/isochrone");
        assert_eq!(iso.params("fromPlace"), vec!["46.2,6.14"]);
        assert_eq!(iso.params("toPlace"), vec!["46.2,6.14"]);
        assert_eq!(iso.params("date"), vec!["03-05-2024"]);
        assert_eq!(iso.params("time"), vec!["02:30PM"]);
        assert_eq!(iso.params("cutoffSec"), vec!["600", "1200"]);
        assert_eq!(iso.params("mode"), vec!["BICYCLE"]);
        assert_eq!(iso.params("arriveBy"), vec!["false"]);
        assert_eq!(iso.params("bikeSpeed"), vec!["5"]);
        assert_eq!(
            iso.headers,
            vec![("x-api-key".to_string(), "secret".to_string())]
        );
    }

    #[test]
    fn test_bike_speed_only_for_cycling() {
        let http = mock();
        let client = RoutingClient::new(&http, "http://localhost:8080/otp").unwrap();
        client
            .calculate_isochrones(&request("Walk").with_bike_speed(18.0))
            .unwrap();
        let requests = http.requests.borrow();
        assert!(requests[1].params("bikeSpeed").is_empty());
        assert!(requests[1].headers.is_empty());
    }

    #[test]
    fn test_upstream_failure_is_surfaced() {
        let http = MockHttp::new()
            .route("/routers/default", 200, ROUTER)
            .route("/routers/default/isochrone", 500, "graph not loaded");
        let client = RoutingClient::new(&http, "http://localhost:8080/otp").unwrap();
        let err = client.calculate_isochrones(&request("Walk")).unwrap_err();
        assert_eq!(err.to_string(), "upstream request failed: 500 - graph not loaded");
    }

    #[test]
    fn test_invalid_request_sends_nothing() {
        let http = mock();
        let client = RoutingClient::new(&http, "http://localhost:8080/otp").unwrap();
        let mut bad = request("Walk");
        bad.cutoffs.clear();
        assert!(matches!(
            client.calculate_isochrones(&bad),
            Err(Error::InvalidRequest(_))
        ));
        assert_eq!(http.request_count(), 0);
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        assert!(RoutingClient::new(MockHttp::new(), "not a url").is_err());
    }
}
