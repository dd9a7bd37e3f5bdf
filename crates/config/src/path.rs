//! Config location resolution
//!
//! Turns the raw `-p <provider>` / `-c <path-or-URL>` pair into an
//! `(endpoint, path, extension)` triple:
//!
//! - `file`: no endpoint, the path is used verbatim
//! - `etcd`: endpoint is `scheme://host:port`, path the request URI
//! - `consul`: endpoint is `host:port`, path the KV key with any
//!   `/v1/kv/` prefix stripped
//!
//! The extension comes from the final path segment with query strings
//! stripped; when absent, the default (`yaml`) applies.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{ConfigError, Result};

/// Configuration store the rule set is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Local file
    File,
    /// etcd v2 keys API
    Etcd,
    /// Consul KV API
    Consul,
}

impl Provider {
    /// CLI name of the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::File => "file",
            Provider::Etcd => "etcd",
            Provider::Consul => "consul",
        }
    }

    /// Whether the provider supports periodic refresh.
    pub fn is_remote(self) -> bool {
        self != Provider::File
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Provider::File),
            "etcd" => Ok(Provider::Etcd),
            "consul" => Ok(Provider::Consul),
            other => Err(ConfigError::UnsupportedProvider(other.to_owned())),
        }
    }
}

/// Resolved config location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Store endpoint; empty for the file provider.
    pub endpoint: String,
    /// Path or key within the store.
    pub path: String,
    /// Decoder selector: `yaml`, `json` or `toml`.
    pub extension: String,
}

/// Default decoder when the path carries no extension.
pub const DEFAULT_EXTENSION: &str = "yaml";

/// Resolve a raw path argument for the given provider.
pub fn parse_path(raw_path: &str, default_extension: &str, provider: Provider) -> Result<Location> {
    let location = match provider {
        Provider::File => {
            // URLs make no sense for local files
            if raw_path.contains("://") {
                return Err(ConfigError::IncorrectPath(Provider::File));
            }
            Location {
                endpoint: String::new(),
                path: raw_path.to_owned(),
                extension: extension_of(raw_path, default_extension),
            }
        }

        Provider::Etcd | Provider::Consul => {
            let url = Url::parse(raw_path).map_err(|e| ConfigError::InvalidPath {
                path: raw_path.to_owned(),
                reason: e.to_string(),
            })?;

            let host = url.host_str().unwrap_or_default();
            if host.is_empty() {
                return Err(ConfigError::EmptyEndpoint(provider));
            }

            let authority = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_owned(),
            };

            let mut path = url.path().to_owned();
            if let Some(query) = url.query() {
                path.push('?');
                path.push_str(query);
            }

            let (endpoint, path) = if provider == Provider::Consul {
                (authority, path.replace("/v1/kv/", ""))
            } else {
                (format!("{}://{}", url.scheme(), authority), path)
            };

            Location {
                endpoint,
                extension: extension_of(&path, default_extension),
                path,
            }
        }
    };

    Ok(location)
}

/// Extension of the final path segment, query string stripped.
fn extension_of(path: &str, default_extension: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        None => default_extension.to_owned(),
        Some(idx) => file[idx + 1..]
            .split('?')
            .next()
            .unwrap_or_default()
            .to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trip() {
        for provider in [Provider::File, Provider::Etcd, Provider::Consul] {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
        assert!("zookeeper".parse::<Provider>().is_err());
    }

    #[test]
    fn file_paths_resolve_verbatim() {
        let location = parse_path("config.yaml", DEFAULT_EXTENSION, Provider::File).unwrap();
        assert_eq!(location.endpoint, "");
        assert_eq!(location.path, "config.yaml");
        assert_eq!(location.extension, "yaml");

        let location = parse_path("config/config.json", DEFAULT_EXTENSION, Provider::File).unwrap();
        assert_eq!(location.path, "config/config.json");
        assert_eq!(location.extension, "json");
    }

    #[test]
    fn missing_extension_falls_back_to_default() {
        let location = parse_path("config", DEFAULT_EXTENSION, Provider::File).unwrap();
        assert_eq!(location.extension, "yaml");
    }

    #[test]
    fn urls_are_rejected_for_files() {
        assert!(matches!(
            parse_path("http://host/config.yaml", DEFAULT_EXTENSION, Provider::File),
            Err(ConfigError::IncorrectPath(Provider::File))
        ));
    }

    #[test]
    fn etcd_splits_endpoint_and_request_uri() {
        let location = parse_path(
            "http://127.0.0.1:4001/config/hugo.json",
            DEFAULT_EXTENSION,
            Provider::Etcd,
        )
        .unwrap();
        assert_eq!(location.endpoint, "http://127.0.0.1:4001");
        assert_eq!(location.path, "/config/hugo.json");
        assert_eq!(location.extension, "json");
    }

    #[test]
    fn query_strings_stay_in_the_path_but_not_the_extension() {
        let location = parse_path(
            "http://127.0.0.1:4001/config/hugo.json?ver=1",
            DEFAULT_EXTENSION,
            Provider::Etcd,
        )
        .unwrap();
        assert_eq!(location.path, "/config/hugo.json?ver=1");
        assert_eq!(location.extension, "json");
    }

    #[test]
    fn consul_strips_kv_prefix_and_scheme() {
        let location = parse_path(
            "http://consul.service:8500/v1/kv/common/db.json",
            "json",
            Provider::Consul,
        )
        .unwrap();
        assert_eq!(location.endpoint, "consul.service:8500");
        assert_eq!(location.path, "common/db.json");
        assert_eq!(location.extension, "json");
    }

    #[test]
    fn unparsable_urls_error() {
        assert!(matches!(
            parse_path("http://127 0 0 1:4001/c.json", DEFAULT_EXTENSION, Provider::Etcd),
            Err(ConfigError::InvalidPath { .. })
        ));
    }
}
