//! HTTP Admin Client
//!
//! `AdminApi` over the search engine's Collections API (`/admin/collections`)
//! and `/select` for document counts. TLS material comes from [`TlsConfig`]
//! and is applied to this client only.

use super::api::AdminApi;
use super::types::{AdminRequest, AdminResponse};
use crate::config::TlsConfig;
use crate::error::{AdminError, AdminResult};

use async_trait::async_trait;
use std::time::Duration;

const COLLECTIONS_ENDPOINT: &str = "/admin/collections";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds a `reqwest` client carrying the configured keystore and truststore.
pub fn build_http_client(tls: &TlsConfig) -> AdminResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

    if let Some(path) = &tls.truststore_location {
        let data = std::fs::read(path)?;
        let kind = tls
            .truststore_type
            .as_deref()
            .unwrap_or("PEM")
            .to_ascii_uppercase();
        let certificate = match kind.as_str() {
            "PEM" => reqwest::Certificate::from_pem(&data)?,
            "DER" => reqwest::Certificate::from_der(&data)?,
            other => {
                return Err(AdminError::Config(format!(
                    "unsupported truststore type '{}'",
                    other
                )));
            }
        };
        builder = builder.add_root_certificate(certificate);
        tracing::info!("Using truststore {}", path.display());
    }

    if let Some(path) = &tls.keystore_location {
        let kind = tls
            .keystore_type
            .as_deref()
            .unwrap_or("PKCS12")
            .to_ascii_uppercase();
        if kind != "PKCS12" {
            return Err(AdminError::Config(format!(
                "unsupported keystore type '{}'",
                kind
            )));
        }
        let data = std::fs::read(path)?;
        let password = tls.keystore_password.as_deref().unwrap_or_default();
        builder = builder.identity(reqwest::Identity::from_pkcs12_der(&data, password)?);
        tracing::info!("Using keystore {}", path.display());
    }

    Ok(builder.build()?)
}

pub struct HttpAdminApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAdminApi {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint and query parameters for a request.
    pub fn request_params(&self, request: &AdminRequest) -> (String, Vec<(&'static str, String)>) {
        let collections = format!("{}{}", self.base_url, COLLECTIONS_ENDPOINT);
        let mut params = vec![("wt", "json".to_string())];

        match request {
            AdminRequest::List => {
                params.push(("action", "LIST".to_string()));
                (collections, params)
            }
            AdminRequest::Create(create) => {
                params.push(("action", "CREATE".to_string()));
                params.push(("name", create.name.clone()));
                params.push(("replicationFactor", create.replication_factor.to_string()));
                params.push(("maxShardsPerNode", create.max_shards_per_node.to_string()));
                params.push(("router.name", create.router_name.clone()));
                if let Some(config_name) = &create.config_name {
                    params.push(("collection.configName", config_name.clone()));
                }
                if let Some(field) = &create.router_field {
                    params.push(("router.field", field.clone()));
                }
                if create.shards.is_empty() {
                    params.push(("numShards", create.num_shards.to_string()));
                } else {
                    params.push(("shards", create.shards.join(",")));
                }
                (collections, params)
            }
            AdminRequest::CreateShard { collection, shard } => {
                params.push(("action", "CREATESHARD".to_string()));
                params.push(("collection", collection.clone()));
                params.push(("shard", shard.clone()));
                (collections, params)
            }
            AdminRequest::ClusterStatus { collection } => {
                params.push(("action", "CLUSTERSTATUS".to_string()));
                if let Some(collection) = collection {
                    params.push(("collection", collection.clone()));
                }
                (collections, params)
            }
            AdminRequest::CountDocuments { collection, shard } => {
                params.push(("q", "*:*".to_string()));
                params.push(("rows", "0".to_string()));
                if let Some(shard) = shard {
                    params.push(("shards", shard.clone()));
                }
                (format!("{}/{}/select", self.base_url, collection), params)
            }
        }
    }
}

#[async_trait]
impl AdminApi for HttpAdminApi {
    async fn execute(&self, request: AdminRequest) -> AdminResult<AdminResponse> {
        let (url, params) = self.request_params(&request);
        tracing::debug!("Admin request {:?} -> {}", request, url);

        let response = self.client.get(&url).query(&params).send().await?;
        let http_status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            AdminError::Transport(format!("{} returned unreadable body ({}): {}", url, http_status, e))
        })?;

        let status = body["responseHeader"]["status"]
            .as_i64()
            .map(|s| s as i32)
            .unwrap_or(if http_status.is_success() {
                0
            } else {
                i32::from(http_status.as_u16())
            });
        let message = body["error"]["msg"].as_str().map(str::to_string);

        Ok(AdminResponse {
            status,
            message,
            body,
        })
    }
}
