//! IP geolocation and city resolution for Beacon.
//!
//! Resolution is cache-aside: a bounded LRU + TTL [`CityCache`] is
//! consulted first, and a miss falls back to the [`LocationSource`] (a
//! MaxMind GeoLite2-City reader in production) followed by a
//! lookup-or-insert against the cities table through the query executor.

pub mod cache;
pub mod error;
pub mod lookup;
pub mod resolver;

pub use cache::CityCache;
pub use error::GeoError;
pub use lookup::{display_name, Location, LocationSource, MaxMindSource, StaticSource};
pub use resolver::GeoResolver;
