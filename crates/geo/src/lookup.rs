//! Location sources: the MaxMind GeoLite2-City reader and the seam tests
//! substitute through.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::Path;

use maxminddb::{geoip2, MaxMindDBError, Reader};

use crate::error::GeoError;

/// A location record as returned by the geo database. Name maps are keyed
/// by locale code ("en", "fr", ...).
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub country_code: String,
    pub city_names: BTreeMap<String, String>,
    pub subdivision_names: Vec<BTreeMap<String, String>>,
    pub longitude: f64,
    pub latitude: f64,
}

/// Read-only IP to location lookup.
pub trait LocationSource: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Result<Location, GeoError>;
}

/// Pick the display form of a name map: the requested language first,
/// then English, then the first available key, then empty. This fallback
/// chain is applied identically to the city and every subdivision name.
pub fn display_name(names: &BTreeMap<String, String>, lang: &str) -> String {
    names
        .get(lang)
        .or_else(|| names.get("en"))
        .or_else(|| names.values().next())
        .cloned()
        .unwrap_or_default()
}

/// GeoLite2-City database reader.
pub struct MaxMindSource {
    reader: Reader<Vec<u8>>,
}

impl MaxMindSource {
    /// Open a MaxMind city database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GeoError> {
        let reader =
            Reader::open_readfile(path).map_err(|err| GeoError::Database(err.to_string()))?;
        Ok(Self { reader })
    }
}

impl LocationSource for MaxMindSource {
    fn lookup(&self, ip: IpAddr) -> Result<Location, GeoError> {
        let city: geoip2::City = self.reader.lookup(ip).map_err(|err| match err {
            MaxMindDBError::AddressNotFoundError(_) => GeoError::Unknown(ip.to_string()),
            other => GeoError::Database(other.to_string()),
        })?;

        let country_code = city
            .country
            .as_ref()
            .and_then(|country| country.iso_code)
            .ok_or_else(|| GeoError::Unknown(ip.to_string()))?
            .to_string();
        let location = city
            .location
            .as_ref()
            .ok_or_else(|| GeoError::Unknown(ip.to_string()))?;
        let (Some(longitude), Some(latitude)) = (location.longitude, location.latitude) else {
            return Err(GeoError::Unknown(ip.to_string()));
        };

        Ok(Location {
            country_code,
            city_names: owned_names(city.city.as_ref().and_then(|c| c.names.as_ref())),
            subdivision_names: city
                .subdivisions
                .as_ref()
                .map(|subdivisions| {
                    subdivisions
                        .iter()
                        .map(|s| owned_names(s.names.as_ref()))
                        .collect()
                })
                .unwrap_or_default(),
            longitude,
            latitude,
        })
    }
}

fn owned_names(names: Option<&BTreeMap<&str, &str>>) -> BTreeMap<String, String> {
    names
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// A fixed in-memory source for tests and local development.
#[derive(Debug, Default)]
pub struct StaticSource {
    locations: HashMap<IpAddr, Location>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ip: IpAddr, location: Location) -> Self {
        self.locations.insert(ip, location);
        self
    }
}

impl LocationSource for StaticSource {
    fn lookup(&self, ip: IpAddr) -> Result<Location, GeoError> {
        self.locations
            .get(&ip)
            .cloned()
            .ok_or_else(|| GeoError::Unknown(ip.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn display_name_prefers_requested_language() {
        let map = names(&[("en", "Munich"), ("de", "München")]);
        assert_eq!(display_name(&map, "de"), "München");
    }

    #[test]
    fn display_name_falls_back_to_english() {
        let map = names(&[("en", "Munich"), ("fr", "Munich FR")]);
        assert_eq!(display_name(&map, "ja"), "Munich");
    }

    #[test]
    fn display_name_falls_back_to_first_key() {
        let map = names(&[("fr", "Munich FR"), ("de", "München")]);
        // BTreeMap iteration order makes "de" the first available key.
        assert_eq!(display_name(&map, "ja"), "München");
    }

    #[test]
    fn display_name_of_empty_map_is_empty() {
        assert_eq!(display_name(&BTreeMap::new(), "en"), "");
    }
}
