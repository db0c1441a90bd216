//! OpenWeather current-weather integration

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const MOCK_NOTICE: &str = "This is mock data as no OpenWeather API key was provided.";

/// Unit system for temperatures and wind speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(PulseError::InvalidInput(format!(
                "units must be metric or imperial, got {:?}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// Current conditions for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: f64,
    pub conditions: String,
    pub humidity: u32,
    pub wind_speed: f64,
    pub description: String,
    pub units: Units,
    /// True when no API key was configured and the values are canned
    pub mock: bool,
}

impl WeatherReport {
    fn mock(city: &str, units: Units) -> Self {
        Self {
            city: city.to_string(),
            temperature: match units {
                Units::Metric => 24.0,
                Units::Imperial => 75.0,
            },
            conditions: "sunny".to_string(),
            humidity: 45,
            wind_speed: 8.5,
            description: MOCK_NOTICE.to_string(),
            units,
            mock: true,
        }
    }
}

/// OpenWeather client
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current weather for `city`
    pub async fn current(&self, city: &str, units: Units) -> Result<WeatherReport> {
        let city = city.trim();
        if city.is_empty() {
            return Err(PulseError::InvalidInput("city is required".to_string()));
        }
        let Some(api_key) = &self.api_key else {
            tracing::debug!("No OpenWeather API key, returning mock weather for {}", city);
            return Ok(WeatherReport::mock(city, units));
        };

        let url = format!("{}/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key.as_str()), ("units", units.as_str())])
            .send()
            .await
            .map_err(|e| PulseError::Transport(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => {
                return Err(PulseError::NotFound(format!("city {}", city)));
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                return Err(PulseError::Credential(
                    "OpenWeather rejected the API key".to_string(),
                ));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(PulseError::Api(format!("Status {}: {}", status, body)));
            }
            _ => {}
        }

        let body = response.text().await?;
        parse_current_weather(city, units, &body)
    }
}

#[derive(Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
    wind: Wind,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: u32,
}

#[derive(Deserialize)]
struct Condition {
    main: String,
    description: String,
}

#[derive(Deserialize)]
struct Wind {
    speed: f64,
}

/// Parse an OpenWeather `/weather` body
pub fn parse_current_weather(city: &str, units: Units, body: &str) -> Result<WeatherReport> {
    let raw: CurrentWeather = serde_json::from_str(body)?;
    let (conditions, description) = raw
        .weather
        .into_iter()
        .next()
        .map(|c| (c.main, c.description))
        .unwrap_or_default();

    Ok(WeatherReport {
        city: city.to_string(),
        temperature: raw.main.temp,
        conditions,
        humidity: raw.main.humidity,
        wind_speed: raw.wind.speed,
        description,
        units,
        mock: false,
    })
}
