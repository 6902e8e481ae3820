use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;
use crate::UNKNOWN;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    format!("photosort/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    10
}

/// Neighborhood-level detail.
fn default_zoom() -> u8 {
    16
}

/// Nominatim's public usage policy allows one request per second.
fn default_min_interval_ms() -> u64 {
    1000
}

/// Settings for the remote reverse-geocoding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeOptions {
    /// When false, every coordinate resolves to "Unknown" without a remote call.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Minimum spacing between two remote calls, in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            zoom: default_zoom(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl GeocodeOptions {
    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading geocoder config {}", path.display()))?;
        let options = serde_json::from_str(&text)
            .with_context(|| format!("parsing geocoder config {}", path.display()))?;
        Ok(options)
    }
}

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Cache key: both coordinates rounded to 5 decimal places (about 1.1 m),
/// stored as scaled integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey(i64, i64);

impl From<Coordinate> for CoordKey {
    fn from(c: Coordinate) -> Self {
        CoordKey(
            (c.latitude * 1e5).round() as i64,
            (c.longitude * 1e5).round() as i64,
        )
    }
}

/// Resolved place names for the current run. Grows monotonically and is
/// never evicted; failures are stored like any other result.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<CoordKey, String>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: CoordKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn put(&mut self, key: CoordKey, name: String) {
        self.entries.insert(key, name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a remote lookup produced no place name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// HTTP 429.
    RateLimited,
    /// HTTP 403; repeated abuse gets a client banned.
    Forbidden,
    /// Any other non-200 status.
    Status(u16),
    /// Transport, timeout or response-parsing error.
    Request(String),
}

impl LookupFailure {
    /// The location string recorded for this failure. It ends up in file names.
    pub fn sentinel(&self) -> String {
        match self {
            LookupFailure::RateLimited => "Rate limited".to_string(),
            LookupFailure::Forbidden => "Forbidden (possible ban)".to_string(),
            LookupFailure::Status(_) => "Reverse geocoding failed".to_string(),
            LookupFailure::Request(detail) => format!("Reverse geocoding error: {}", detail),
        }
    }
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Status(code) => write!(f, "HTTP {}", code),
            other => write!(f, "{}", other.sentinel()),
        }
    }
}

/// A reverse-geocoding backend.
pub trait ReverseLookup: Send {
    fn reverse(&mut self, at: Coordinate) -> Result<String, LookupFailure>;

    /// Whether `reverse` goes over the network.
    fn is_remote(&self) -> bool {
        true
    }
}

/// Address components, most specific first.
#[derive(Debug, Default, Deserialize)]
struct Address {
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

/// First populated locality field, or "Unknown".
fn place_name(address: &Address) -> String {
    [
        &address.suburb,
        &address.city,
        &address.town,
        &address.village,
        &address.hamlet,
    ]
    .into_iter()
    .flatten()
    .find(|name| !name.trim().is_empty())
    .cloned()
    .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Blocking client for a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    zoom: u8,
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl NominatimClient {
    pub fn new(options: &GeocodeOptions) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: options.endpoint.clone(),
            zoom: options.zoom,
            min_interval: Duration::from_millis(options.min_interval_ms),
            last_request: None,
        })
    }

    /// Sleep until at least `min_interval` has passed since the previous request.
    fn wait_turn(&self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
    }
}

impl ReverseLookup for NominatimClient {
    fn reverse(&mut self, at: Coordinate) -> Result<String, LookupFailure> {
        self.wait_turn();
        let sent = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("format", "json".to_string()),
                ("zoom", self.zoom.to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send();
        self.last_request = Some(Instant::now());

        let response = sent.map_err(|e| LookupFailure::Request(e.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                let body: ReverseResponse = response
                    .json()
                    .map_err(|e| LookupFailure::Request(e.to_string()))?;
                Ok(place_name(&body.address))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(LookupFailure::RateLimited),
            StatusCode::FORBIDDEN => Err(LookupFailure::Forbidden),
            other => Err(LookupFailure::Status(other.as_u16())),
        }
    }
}

/// Offline backend: never touches the network.
pub struct DisabledLookup;

impl ReverseLookup for DisabledLookup {
    fn reverse(&mut self, _at: Coordinate) -> Result<String, LookupFailure> {
        Ok(UNKNOWN.to_string())
    }

    fn is_remote(&self) -> bool {
        false
    }
}

/// Maps coordinates to place names, asking the backend at most once per
/// rounded coordinate for the lifetime of the resolver.
pub struct GeocodeResolver {
    lookup: Box<dyn ReverseLookup>,
    cache: GeocodeCache,
    remote_calls: u64,
}

impl GeocodeResolver {
    pub fn new(lookup: Box<dyn ReverseLookup>) -> Self {
        Self {
            lookup,
            cache: GeocodeCache::new(),
            remote_calls: 0,
        }
    }

    /// Build the resolver a run should use: a Nominatim client, or the
    /// offline backend when geocoding is disabled.
    pub fn from_options(options: &GeocodeOptions) -> crate::error::Result<Self> {
        if !options.enabled {
            return Ok(Self::new(Box::new(DisabledLookup)));
        }
        let client = NominatimClient::new(options).map_err(|e| {
            ProcessError::configuration(format!("cannot create geocoding client: {}", e))
        })?;
        Ok(Self::new(Box::new(client)))
    }

    pub fn resolve(&mut self, at: Coordinate) -> String {
        let key = CoordKey::from(at);
        if let Some(name) = self.cache.get(key) {
            log::debug!("geocode cache hit {:?} -> {}", key, name);
            return name.to_string();
        }

        if self.lookup.is_remote() {
            self.remote_calls += 1;
        }
        let name = match self.lookup.reverse(at) {
            Ok(name) => name,
            Err(failure) => {
                log::warn!(
                    "reverse geocoding {:.5},{:.5} failed: {}",
                    at.latitude,
                    at.longitude,
                    failure
                );
                failure.sentinel()
            }
        };
        log::debug!("geocode cache miss {:?} -> {}", key, name);
        self.cache.put(key, name.clone());
        name
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Cache misses answered by a remote backend.
    pub fn remote_calls(&self) -> u64 {
        self.remote_calls
    }
}
