//! Live sensor feeds.

use async_trait::async_trait;
use safe_route_geography_models::GeoPoint;
use safe_route_risk_models::{SensorKind, SensorReading};
use serde::Deserialize;

use crate::{SensorError, SensorMonitor};

/// Open-Meteo forecast endpoint. No API key required.
pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Source of live sensor readings.
#[async_trait]
pub trait SensorFeed: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetches the current reading of every sensor.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError`] if the feed cannot be reached or answers
    /// with malformed data.
    async fn poll(&self) -> Result<Vec<SensorReading>, SensorError>;
}

/// A station whose value is derived from current rainfall at its location.
///
/// `value = baseline + rain_factor * rain_mm`. A rain gauge is simply
/// `baseline = 0, rain_factor = 1`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationConfig {
    /// Sensor ID.
    pub id: String,
    /// Sensor kind.
    pub kind: SensorKind,
    /// Station name.
    pub label: String,
    /// Station location.
    pub point: GeoPoint,
    /// Value with no rain.
    #[serde(default)]
    pub baseline: f64,
    /// Increase per mm of current rain.
    #[serde(default)]
    pub rain_factor: f64,
}

impl StationConfig {
    /// Builds the reading for this station given current rain.
    #[must_use]
    pub fn reading(&self, rain_mm: f64, monitor: &SensorMonitor) -> SensorReading {
        let value = self.rain_factor.mul_add(rain_mm, self.baseline);
        SensorReading {
            id: self.id.clone(),
            kind: self.kind,
            label: self.label.clone(),
            point: self.point,
            value,
            unit: unit_for(self.kind).to_string(),
            status: monitor.status_for(self.kind, value),
        }
    }
}

/// Display unit for a sensor kind.
#[must_use]
pub const fn unit_for(kind: SensorKind) -> &'static str {
    match kind {
        SensorKind::RainGauge => "mm",
        SensorKind::RiverLevel => "cm",
        SensorKind::Seismic => "R",
        SensorKind::SoilMoisture => "%",
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    rain: Option<f64>,
}

/// Extracts current rain (mm) from a forecast response body.
fn parse_current_rain(body: &str) -> Result<f64, SensorError> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|e| SensorError::InvalidResponse {
            message: format!("malformed forecast: {e}"),
        })?;

    match response.current.rain {
        Some(rain) if rain.is_finite() && rain >= 0.0 => Ok(rain),
        other => Err(SensorError::InvalidResponse {
            message: format!("unusable rain value {other:?}"),
        }),
    }
}

/// Feed deriving station readings from Open-Meteo current rainfall.
pub struct OpenMeteoFeed {
    base_url: String,
    stations: Vec<StationConfig>,
    monitor: SensorMonitor,
    client: reqwest::Client,
}

impl OpenMeteoFeed {
    /// Creates a feed for `stations`.
    #[must_use]
    pub fn new(base_url: String, stations: Vec<StationConfig>, monitor: SensorMonitor) -> Self {
        Self {
            base_url,
            stations,
            monitor,
            client: reqwest::Client::new(),
        }
    }

    async fn current_rain(&self, point: &GeoPoint) -> Result<f64, SensorError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", point.lat().to_string()),
                ("longitude", point.lng().to_string()),
                ("current", "rain".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(SensorError::InvalidResponse {
                message: format!("HTTP {status}: {body}"),
            });
        }

        parse_current_rain(&body)
    }
}

#[async_trait]
impl SensorFeed for OpenMeteoFeed {
    fn name(&self) -> &str {
        "open-meteo"
    }

    async fn poll(&self) -> Result<Vec<SensorReading>, SensorError> {
        let mut readings = Vec::with_capacity(self.stations.len());
        for station in &self.stations {
            let rain = self.current_rain(&station.point).await?;
            log::debug!("Station {} rain {rain}mm", station.id);
            readings.push(station.reading(rain, &self.monitor));
        }
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use safe_route_risk_models::SensorStatus;

    use super::*;

    fn station(kind: SensorKind, baseline: f64, rain_factor: f64) -> StationConfig {
        StationConfig {
            id: "SENS-01".to_string(),
            kind,
            label: "Brahmaputra Alpha".to_string(),
            point: GeoPoint::new(26.15, 91.74).unwrap(),
            baseline,
            rain_factor,
        }
    }

    #[test]
    fn parses_current_rain() {
        let body = r#"{"latitude":26.14,"longitude":91.73,"current":{"time":"2024-07-01T10:00","rain":3.4}}"#;
        assert!((parse_current_rain(body).unwrap() - 3.4).abs() < 1e-12);
    }

    #[test]
    fn rejects_missing_rain() {
        assert!(parse_current_rain(r#"{"current":{}}"#).is_err());
        assert!(parse_current_rain(r#"{"current":{"rain":-1.0}}"#).is_err());
        assert!(parse_current_rain("oops").is_err());
    }

    #[test]
    fn river_level_rises_with_rain() {
        let monitor = SensorMonitor::default();
        let river = station(SensorKind::RiverLevel, 120.0, 2.0);

        let dry = river.reading(0.0, &monitor);
        assert!((dry.value - 120.0).abs() < 1e-12);
        assert_eq!(dry.status, SensorStatus::Normal);
        assert_eq!(dry.unit, "cm");

        let wet = river.reading(20.0, &monitor);
        assert!((wet.value - 160.0).abs() < 1e-12);
        assert_eq!(wet.status, SensorStatus::Critical);
    }

    #[test]
    fn station_config_deserializes() {
        let toml_str = r#"
            id = "SENS-02"
            kind = "RAIN_GAUGE"
            label = "Shillong Outpost"
            point = { lat = 25.57, lng = 91.89 }
            rain_factor = 1.0
        "#;
        let station: StationConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(station.kind, SensorKind::RainGauge);
        assert!(station.baseline.abs() < 1e-12);
    }
}
