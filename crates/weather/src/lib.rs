//! Weather lookups: date classification, coordinate resolution, and the
//! current/forecast/archive data fetches behind the `get_weather` tool.

pub mod dates;
pub mod geocode;
pub mod observation;
pub mod service;

pub use dates::{classify, DateClassification};
pub use geocode::{builtin_lookup, Coordinates, GeocodingClient};
pub use observation::WeatherObservation;
pub use service::{LookupOutcome, WeatherLookup, WeatherService};
