//! External lookups exposed as tools
//!
//! Currently supported:
//! - OpenWeather current conditions (mock data without an API key)
//! - DuckDuckGo instant answers

pub mod search;
pub mod weather;

pub use search::{parse_instant_answer, SearchClient, SearchResult};
pub use weather::{parse_current_weather, Units, WeatherClient, WeatherReport};
