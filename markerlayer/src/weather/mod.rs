//! On-demand weather lookups for marker popups.
//!
//! Weather is fetched lazily when a popup wants it, never as part of the
//! refresh cycle; a slow or failing weather endpoint must not stall marker
//! reconciliation.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// A weather observation at a marker's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Cloud cover in percent.
    #[serde(default)]
    pub clouds: Option<f64>,

    #[serde(default)]
    pub temperature: Option<f64>,

    /// Pressure in hPa.
    #[serde(default)]
    pub pressure: Option<f64>,

    /// Relative humidity in percent.
    #[serde(default)]
    pub humidity: Option<f64>,

    /// Short condition description ("overcast", "light rain").
    #[serde(default)]
    pub weather: Option<String>,

    #[serde(default)]
    pub wind_speed: Option<f64>,

    /// Wind bearing in degrees.
    #[serde(default)]
    pub wind_direction: Option<f64>,
}

impl WeatherReport {
    /// One-line summary for popup display.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(temperature) = self.temperature {
            parts.push(format!("{temperature:.1}°C"));
        }
        if let Some(speed) = self.wind_speed {
            match self.wind_direction {
                Some(direction) => parts.push(format!("wind {speed:.0} km/h @ {direction:.0}°")),
                None => parts.push(format!("wind {speed:.0} km/h")),
            }
        }
        if let Some(humidity) = self.humidity {
            parts.push(format!("{humidity:.0}% rh"));
        }
        if let Some(weather) = &self.weather {
            parts.push(weather.clone());
        }
        if parts.is_empty() {
            "no data".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Errors from a weather lookup.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Looks up weather for a coordinate.
pub trait WeatherLookup: Send + Sync {
    fn lookup(&self, lat: f64, lon: f64) -> BoxFuture<'_, Result<WeatherReport, WeatherError>>;
}

/// HTTP-backed weather lookup.
///
/// The endpoint URL is a template with `{lat}` and `{lon}` placeholders,
/// e.g. `https://wx.example/point?lat={lat}&lon={lon}`.
#[derive(Debug, Clone)]
pub struct HttpWeatherLookup {
    client: reqwest::Client,
    url_template: String,
}

impl HttpWeatherLookup {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }

    pub fn with_client(client: reqwest::Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    fn render_url(&self, lat: f64, lon: f64) -> String {
        self.url_template
            .replace("{lat}", &lat.to_string())
            .replace("{lon}", &lon.to_string())
    }
}

impl WeatherLookup for HttpWeatherLookup {
    fn lookup(&self, lat: f64, lon: f64) -> BoxFuture<'_, Result<WeatherReport, WeatherError>> {
        let url = self.render_url(lat, lon);
        Box::pin(async move {
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(WeatherError::Status(response.status()));
            }
            Ok(response.json::<WeatherReport>().await?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_url_substitutes_placeholders() {
        let lookup = HttpWeatherLookup::new("https://wx.example/point?lat={lat}&lon={lon}");
        assert_eq!(
            lookup.render_url(51.5, -0.25),
            "https://wx.example/point?lat=51.5&lon=-0.25"
        );
    }

    #[test]
    fn test_report_parses_camel_case() {
        let report: WeatherReport = serde_json::from_str(
            r#"{"clouds":75.0,"temperature":12.5,"pressure":1013.0,"humidity":80.0,"weather":"overcast","windSpeed":30.0,"windDirection":270.0}"#,
        )
        .unwrap();
        assert_eq!(report.clouds, Some(75.0));
        assert_eq!(report.temperature, Some(12.5));
        assert_eq!(report.pressure, Some(1013.0));
        assert_eq!(report.humidity, Some(80.0));
        assert_eq!(report.wind_speed, Some(30.0));
        assert_eq!(report.wind_direction, Some(270.0));
    }

    #[test]
    fn test_summary_formats_available_fields() {
        let report = WeatherReport {
            clouds: None,
            temperature: Some(12.5),
            pressure: None,
            humidity: Some(80.0),
            weather: Some("overcast".to_string()),
            wind_speed: Some(30.0),
            wind_direction: Some(270.0),
        };
        assert_eq!(
            report.summary(),
            "12.5°C, wind 30 km/h @ 270°, 80% rh, overcast"
        );
    }

    #[test]
    fn test_summary_empty_report() {
        let report: WeatherReport = serde_json::from_str("{}").unwrap();
        assert_eq!(report.summary(), "no data");
    }
}
