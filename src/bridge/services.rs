use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ApiKeys, Config};

/// The fixed set of upstream stock-photo providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Unsplash,
    Pixabay,
    Pexels,
    Flickr,
    Stocksnap,
    Splashbase,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown service: {0}")]
pub struct UnknownService(pub String);

impl ServiceKind {
    pub const ALL: [ServiceKind; 6] = [
        ServiceKind::Unsplash,
        ServiceKind::Pixabay,
        ServiceKind::Pexels,
        ServiceKind::Flickr,
        ServiceKind::Stocksnap,
        ServiceKind::Splashbase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Unsplash => "unsplash",
            ServiceKind::Pixabay => "pixabay",
            ServiceKind::Pexels => "pexels",
            ServiceKind::Flickr => "flickr",
            ServiceKind::Stocksnap => "stocksnap",
            ServiceKind::Splashbase => "splashbase",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ServiceKind::Unsplash => "https://api.unsplash.com/search/photos/",
            ServiceKind::Pixabay => "https://pixabay.com/api/",
            ServiceKind::Pexels => "http://api.pexels.com/v1/search",
            ServiceKind::Flickr => "https://api.flickr.com/services/rest/",
            ServiceKind::Stocksnap => "https://stocksnap.io/api/search-photos/",
            ServiceKind::Splashbase => "http://www.splashbase.co/api/v1/images/search",
        }
    }

    /// How the provider expects its credential
    pub fn credential(&self) -> Option<Credential> {
        match self {
            ServiceKind::Unsplash => Some(Credential::Query("client_id")),
            ServiceKind::Pixabay => Some(Credential::Query("key")),
            ServiceKind::Pexels => Some(Credential::Header("Authorization")),
            ServiceKind::Flickr => Some(Credential::Query("api_key")),
            ServiceKind::Stocksnap | ServiceKind::Splashbase => None,
        }
    }

    fn api_key<'a>(&self, keys: &'a ApiKeys) -> Option<&'a str> {
        match self {
            ServiceKind::Unsplash => keys.unsplash.as_deref(),
            ServiceKind::Pixabay => keys.pixabay.as_deref(),
            ServiceKind::Pexels => keys.pexels.as_deref(),
            ServiceKind::Flickr => keys.flickr.as_deref(),
            ServiceKind::Stocksnap | ServiceKind::Splashbase => None,
        }
    }
}

impl FromStr for ServiceKind {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownService(s.to_string()))
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Query(&'static str),
    Header(&'static str),
}

/// Connection parameters for one upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub base_url: String,
    /// Merged over the caller's query; wins on key conflicts
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            base_url: kind.default_base_url().to_string(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Attach the provider credential in the place the provider expects it
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        match self.kind.credential() {
            Some(Credential::Query(name)) => {
                self.query.insert(name.to_string(), key.into());
            }
            Some(Credential::Header(name)) => {
                self.headers.insert(name.to_string(), key.into());
            }
            None => {}
        }
        self
    }
}

/// Registry mapping service names to descriptors
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ServiceDescriptor) {
        self.services
            .insert(descriptor.kind.as_str().to_string(), descriptor);
    }

    /// Explicit lookup; unknown names never fall back to a partial descriptor
    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Built-in base URLs, no credentials
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ServiceKind::ALL {
            registry.register(ServiceDescriptor::new(kind));
        }
        registry
    }

    /// Built-in descriptors with configured base URL overrides and API keys
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for kind in ServiceKind::ALL {
            let mut descriptor = ServiceDescriptor::new(kind);

            if let Some(base_url) = config
                .services
                .get(kind.as_str())
                .and_then(|service| service.base_url.as_ref())
            {
                descriptor = descriptor.with_base_url(base_url.clone());
            }

            if let Some(key) = kind.api_key(&config.api_keys) {
                descriptor = descriptor.with_api_key(key);
            }

            registry.register(descriptor);
        }

        registry
    }
}
