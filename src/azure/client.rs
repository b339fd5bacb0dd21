//! Azure Client
//!
//! The ARM implementation of [`ResourceProvider`], combining authentication
//! and HTTP functionality. List calls follow `nextLink` pagination to
//! exhaustion; all errors arrive as the typed [`ProviderError`].

use super::auth::AzureCredentials;
use super::http::ArmHttpClient;
use crate::resource::{
    Draft, FormalStatus, ProviderError, Resource, ResourceId, ResourceKind, ResourceProvider,
};
use async_trait::async_trait;
use serde_json::{json, Value};

/// ARM public cloud endpoint
const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// api-version for subscription-level enumeration routes
const LIST_API_VERSION: &str = "2021-04-01";

/// Location applied to creation drafts that did not pick one
const DEFAULT_LOCATION: &str = "westeurope";

/// Main Azure client
#[derive(Clone)]
pub struct AzureClient {
    pub credentials: AzureCredentials,
    pub http: ArmHttpClient,
    pub subscription: String,
    endpoint: String,
}

impl AzureClient {
    /// Create a client against the public ARM endpoint, authenticating via
    /// the Azure CLI
    pub async fn new(subscription: &str) -> anyhow::Result<Self> {
        let credentials = AzureCredentials::new().await?;
        let http = ArmHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            subscription: subscription.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Client against an explicit endpoint with supplied credentials.
    /// Test entry point; also covers sovereign-cloud endpoints.
    pub fn for_endpoint(
        subscription: &str,
        endpoint: &str,
        credentials: AzureCredentials,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            credentials,
            http: ArmHttpClient::new()?,
            subscription: subscription.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn token(&self) -> Result<String, ProviderError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))
    }

    // =========================================================================
    // URL builders
    // =========================================================================

    /// URL for a single resource
    pub fn resource_url(&self, id: &ResourceId, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, id, api_version)
    }

    /// URL listing the subscription's resource groups
    pub fn resource_groups_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups?api-version={}",
            self.endpoint, self.subscription, LIST_API_VERSION
        )
    }

    /// URL listing the resources inside a resource group
    pub fn group_resources_url(&self, group_id: &ResourceId) -> String {
        format!(
            "{}{}/resources?api-version={}",
            self.endpoint, group_id, LIST_API_VERSION
        )
    }

    /// Target id for a draft: the origin id for updates, a freshly built ARM
    /// id for creations
    fn draft_target(&self, draft: &Draft) -> Result<ResourceId, ProviderError> {
        if let Some(origin) = draft.origin() {
            return Ok(origin.id().clone());
        }

        // names are user input; escape them before they land in a URL path
        let name = urlencoding::encode(draft.name());
        let id = match draft.kind() {
            ResourceKind::ResourceGroup => format!(
                "/subscriptions/{}/resourceGroups/{}",
                self.subscription, name
            ),
            kind => {
                let group = draft.resource_group().ok_or_else(|| {
                    ProviderError::Api("creation draft has no target resource group".to_string())
                })?;
                format!(
                    "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
                    self.subscription,
                    group,
                    kind.arm_type(),
                    name
                )
            }
        };
        Ok(ResourceId::new(id))
    }

    /// Kind inferred from an ARM id's provider/type segments
    fn kind_of(id: &ResourceId) -> ResourceKind {
        id.provider_type()
            .map(|t| ResourceKind::from_arm_type(&t))
            .unwrap_or(ResourceKind::ResourceGroup)
    }

    /// Fetch every page of a list response, following `nextLink`
    async fn fetch_all_pages(&self, first_url: String) -> Result<Vec<Value>, ProviderError> {
        let mut items = Vec::new();
        let mut url = Some(first_url);

        while let Some(current) = url {
            let token = self.token().await?;
            let response = self.http.get(&current, &token).await?;

            if let Some(page) = response.get("value").and_then(|v| v.as_array()) {
                items.extend(page.iter().cloned());
            }

            url = response
                .get("nextLink")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }

        Ok(items)
    }
}

/// Request body for a create-or-update PUT
fn draft_body(draft: &Draft) -> Value {
    let mut body = json!({
        "location": draft.location().unwrap_or(DEFAULT_LOCATION),
    });
    if let Some(sku) = draft.sku() {
        body["sku"] = json!({ "name": sku });
    }
    if !draft.tags().is_empty() {
        body["tags"] = json!(draft.tags());
    }
    body
}

#[async_trait]
impl ResourceProvider for AzureClient {
    async fn list_resources(&self, parent: &ResourceId) -> Result<Vec<Resource>, ProviderError> {
        if parent.is_synthetic() {
            return Err(ProviderError::Api(format!(
                "synthetic node {} has no provider listing",
                parent
            )));
        }

        let url = if parent.resource_group().is_some() {
            self.group_resources_url(parent)
        } else {
            self.resource_groups_url()
        };

        let items = self.fetch_all_pages(url).await?;
        Ok(items
            .iter()
            .filter_map(Resource::from_arm_json)
            .collect())
    }

    async fn create_or_update(&self, draft: &Draft) -> Result<Resource, ProviderError> {
        let target = self.draft_target(draft)?;
        let url = self.resource_url(&target, draft.kind().api_version());
        let token = self.token().await?;

        let response = self.http.put(&url, &token, &draft_body(draft)).await?;
        Resource::from_arm_json(&response).ok_or_else(|| {
            ProviderError::Api(format!("malformed create response for {}", target))
        })
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), ProviderError> {
        let url = self.resource_url(id, Self::kind_of(id).api_version());
        let token = self.token().await?;
        self.http.delete(&url, &token).await?;
        Ok(())
    }

    async fn get_status(&self, id: &ResourceId) -> Result<FormalStatus, ProviderError> {
        let kind = Self::kind_of(id);
        let mut url = self.resource_url(id, kind.api_version());

        // Power state for VMs only arrives with the instance view
        if kind == ResourceKind::VirtualMachine {
            url.push_str("&$expand=instanceView");
        }

        let token = self.token().await?;
        let response = self.http.get(&url, &token).await?;

        if kind == ResourceKind::VirtualMachine {
            let power_state = response
                .get("properties")
                .and_then(|p| p.get("instanceView"))
                .and_then(|iv| iv.get("statuses"))
                .and_then(|v| v.as_array())
                .and_then(|statuses| {
                    statuses.iter().find_map(|s| {
                        s.get("code")
                            .and_then(|c| c.as_str())
                            .filter(|c| c.starts_with("PowerState/"))
                    })
                });
            if let Some(code) = power_state {
                return Ok(FormalStatus::from_power_state(code));
            }
        }

        Ok(response
            .get("properties")
            .and_then(|p| p.get("provisioningState"))
            .and_then(|v| v.as_str())
            .map(FormalStatus::from_provisioning_state)
            .unwrap_or_default())
    }
}
