//! Rainfall readings: user simulation or live observation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::LatLng;
use crate::source::SourceError;

/// Coarse weather state derived from a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Thunderstorm,
}

impl WeatherCondition {
    pub fn from_code(code: i64) -> Self {
        match code {
            51..=67 => WeatherCondition::Rain,
            c if c >= 95 => WeatherCondition::Thunderstorm,
            1..=3 => WeatherCondition::Cloudy,
            _ => WeatherCondition::Clear,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Thunderstorm => "thunderstorm",
        }
    }
}

/// The one active rainfall value. Simulation and live modes exclude each
/// other by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RainfallReading {
    /// User-entered amount in whole millimetres.
    Simulated { millimetres: u32 },
    /// Observed precipitation.
    Observed { millimetres: f64, condition: WeatherCondition },
}

impl RainfallReading {
    pub fn simulated(millimetres: u32) -> Self {
        RainfallReading::Simulated { millimetres }
    }

    pub fn millimetres(&self) -> f64 {
        match self {
            RainfallReading::Simulated { millimetres } => f64::from(*millimetres),
            RainfallReading::Observed { millimetres, .. } => *millimetres,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, RainfallReading::Observed { .. })
    }

    /// Gauge caption, e.g. `"User simulation"` or `"Live (rain)"`.
    pub fn label(&self) -> String {
        match self {
            RainfallReading::Simulated { .. } => "User simulation".to_string(),
            RainfallReading::Observed { condition, .. } => format!("Live ({})", condition.name()),
        }
    }
}

/// Where live rainfall comes from.
pub trait RainfallSource {
    fn observe(&self) -> Result<RainfallReading, SourceError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    precipitation: f64,
    weather_code: i64,
}

/// Open-Meteo current-conditions client.
pub struct OpenMeteo {
    agent: ureq::Agent,
    base_url: String,
    location: LatLng,
    timezone: String,
}

impl OpenMeteo {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.open-meteo.com/v1/forecast";
    pub const DEFAULT_TIMEZONE: &'static str = "Asia/Seoul";

    pub fn new(
        base_url: impl Into<String>,
        location: LatLng,
        timezone: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.into(),
            location,
            timezone: timezone.into(),
        }
    }
}

impl RainfallSource for OpenMeteo {
    fn observe(&self) -> Result<RainfallReading, SourceError> {
        let body: ForecastResponse = self
            .agent
            .get(&self.base_url)
            .query("latitude", format!("{:.2}", self.location.lat))
            .query("longitude", format!("{:.2}", self.location.lng))
            .query("current", "precipitation,weather_code")
            .query("timezone", &self.timezone)
            .call()?
            .body_mut()
            .read_json()
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        reading_from(body)
    }
}

fn reading_from(body: ForecastResponse) -> Result<RainfallReading, SourceError> {
    let millimetres = body.current.precipitation;
    if !(millimetres >= 0.0) {
        return Err(SourceError::Decode(format!("precipitation {} is not a valid amount", millimetres)));
    }
    Ok(RainfallReading::Observed {
        millimetres,
        condition: WeatherCondition::from_code(body.current.weather_code),
    })
}
