//! Config sources - file, etcd and Consul fetchers
//!
//! One [`ConfigSource`] per provider, all returning the raw config bytes.
//! The remote fetchers are thin HTTP clients over the stores' plain KV
//! read APIs; anything fancier (watches, auth) stays out of scope.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::path::{Location, Provider};

/// A fetchable configuration location.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the raw configuration payload.
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable location for logging.
    fn describe(&self) -> String;
}

/// Build the source matching a resolved location.
pub fn source_for(provider: Provider, location: &Location) -> Result<Box<dyn ConfigSource>> {
    match provider {
        Provider::File => {
            if !location.endpoint.is_empty() {
                return Err(ConfigError::IncorrectPath(Provider::File));
            }
            Ok(Box::new(FileSource {
                path: location.path.clone(),
            }))
        }

        Provider::Etcd | Provider::Consul => {
            if location.endpoint.is_empty() {
                return Err(ConfigError::EmptyEndpoint(provider));
            }
            let client = Client::new();
            if provider == Provider::Etcd {
                Ok(Box::new(EtcdSource {
                    endpoint: location.endpoint.clone(),
                    path: location.path.clone(),
                    client,
                }))
            } else {
                Ok(Box::new(ConsulSource {
                    endpoint: location.endpoint.clone(),
                    path: location.path.clone(),
                    client,
                }))
            }
        }
    }
}

/// Local file source.
pub struct FileSource {
    path: String,
}

#[async_trait]
impl ConfigSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path)
    }
}

/// etcd v2 keys API response envelope.
#[derive(Debug, Deserialize)]
struct EtcdResponse {
    node: Option<EtcdNode>,
}

#[derive(Debug, Deserialize)]
struct EtcdNode {
    value: Option<String>,
}

/// etcd source reading one key through the v2 HTTP API.
pub struct EtcdSource {
    endpoint: String,
    path: String,
    client: Client,
}

#[async_trait]
impl ConfigSource for EtcdSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let url = format!("{}/v2/keys{}", self.endpoint, self.path);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Err(ConfigError::KeyNotFound {
                key: self.path.clone(),
            });
        }

        let envelope: EtcdResponse = response.error_for_status()?.json().await?;
        envelope
            .node
            .and_then(|node| node.value)
            .map(String::into_bytes)
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: self.path.clone(),
            })
    }

    fn describe(&self) -> String {
        format!("etcd {}{}", self.endpoint, self.path)
    }
}

/// Consul source reading one key as a raw value.
pub struct ConsulSource {
    endpoint: String,
    path: String,
    client: Client,
}

#[async_trait]
impl ConfigSource for ConsulSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let url = format!("http://{}/v1/kv/{}?raw", self.endpoint, self.path);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Err(ConfigError::KeyNotFound {
                key: self.path.clone(),
            });
        }

        Ok(response.error_for_status()?.bytes().await?.to_vec())
    }

    fn describe(&self) -> String {
        format!("consul {}/{}", self.endpoint, self.path)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn file_source_reads_bytes() {
        let dir = std::env::temp_dir().join("reflex-config-source-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rules.yaml");
        std::fs::write(&path, b"rules: []").unwrap();

        let source = FileSource {
            path: path.to_string_lossy().into_owned(),
        };
        assert_eq!(source.fetch().await.unwrap(), b"rules: []");
    }

    #[tokio::test]
    async fn file_source_reports_missing_files() {
        let source = FileSource {
            path: "/nonexistent/reflex.yaml".to_owned(),
        };
        assert!(matches!(
            source.fetch().await,
            Err(ConfigError::Io { .. })
        ));
    }

    async fn spawn_kv(body: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn etcd_source_unwraps_node_value() {
        let addr = spawn_kv(r#"{"action":"get","node":{"key":"/c","value":"rules: []"}}"#).await;
        let source = EtcdSource {
            endpoint: format!("http://{addr}"),
            path: "/c".to_owned(),
            client: Client::new(),
        };
        assert_eq!(source.fetch().await.unwrap(), b"rules: []");
    }

    #[tokio::test]
    async fn consul_source_returns_raw_body() {
        let addr = spawn_kv("rules: []").await;
        let source = ConsulSource {
            endpoint: addr.to_string(),
            path: "common/reflex.yaml".to_owned(),
            client: Client::new(),
        };
        assert_eq!(source.fetch().await.unwrap(), b"rules: []");
    }
}
