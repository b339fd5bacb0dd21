//! Resource Model
//!
//! Typed identity for Azure resources: ARM resource ids, a tagged kind with
//! per-kind capabilities, and the provider-reported formal status used for
//! action enablement.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Prefix for synthetic grouping nodes (Favorites, Linked Resources, ...).
/// Synthetic ids never reach the provider.
const SYNTHETIC_PREFIX: &str = "taz:";

/// An ARM resource id, e.g.
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{name}`
///
/// Globally unique within a subscription scope. Comparison is case-sensitive
/// on the raw string; segment lookup is case-insensitive because ARM is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for a subscription root
    pub fn subscription_root(subscription: &str) -> Self {
        Self(format!("/subscriptions/{}", subscription))
    }

    /// Id for a synthetic grouping node
    pub fn synthetic(key: &str) -> Self {
        Self(format!("{}{}", SYNTHETIC_PREFIX, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }

    /// Value of the segment following `key`, matched case-insensitively
    fn segment_after(&self, key: &str) -> Option<&str> {
        let mut parts = self.0.split('/');
        while let Some(part) = parts.next() {
            if part.eq_ignore_ascii_case(key) {
                return parts.next().filter(|s| !s.is_empty());
            }
        }
        None
    }

    #[allow(dead_code)]
    pub fn subscription(&self) -> Option<&str> {
        self.segment_after("subscriptions")
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.segment_after("resourceGroups")
    }

    /// Last path segment; the resource name for a full ARM id
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The `{namespace}/{type}` pair after `/providers/`, e.g.
    /// `Microsoft.Compute/virtualMachines`. None for resource groups and
    /// synthetic ids.
    pub fn provider_type(&self) -> Option<String> {
        let mut parts = self.0.split('/');
        while let Some(part) = parts.next() {
            if part.eq_ignore_ascii_case("providers") {
                let namespace = parts.next()?;
                let ty = parts.next()?;
                return Some(format!("{}/{}", namespace, ty));
            }
        }
        None
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations a resource kind supports. Dispatch happens by kind, not by
/// subclassing: a kind without `delete` never gets a delete action offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub get_status: bool,
}

/// Tagged union over resource kind.
///
/// `Generic` carries the raw ARM type tag for resources taz lists but has no
/// dedicated handling for; those are view-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    ResourceGroup,
    VirtualMachine,
    StorageAccount,
    PostgresServer,
    Generic(String),
}

impl ResourceKind {
    /// Map an ARM `type` tag to a kind
    pub fn from_arm_type(arm_type: &str) -> Self {
        match arm_type.to_ascii_lowercase().as_str() {
            "microsoft.resources/resourcegroups" => Self::ResourceGroup,
            "microsoft.compute/virtualmachines" => Self::VirtualMachine,
            "microsoft.storage/storageaccounts" => Self::StorageAccount,
            "microsoft.dbforpostgresql/flexibleservers" => Self::PostgresServer,
            _ => Self::Generic(arm_type.to_string()),
        }
    }

    /// The ARM `type` tag for this kind
    pub fn arm_type(&self) -> &str {
        match self {
            Self::ResourceGroup => "Microsoft.Resources/resourceGroups",
            Self::VirtualMachine => "Microsoft.Compute/virtualMachines",
            Self::StorageAccount => "Microsoft.Storage/storageAccounts",
            Self::PostgresServer => "Microsoft.DBforPostgreSQL/flexibleServers",
            Self::Generic(t) => t,
        }
    }

    /// ARM api-version used for calls on this kind
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "2021-04-01",
            Self::VirtualMachine => "2023-09-01",
            Self::StorageAccount => "2023-01-01",
            Self::PostgresServer => "2022-12-01",
            Self::Generic(_) => "2021-04-01",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::ResourceGroup => "Resource Group",
            Self::VirtualMachine => "Virtual Machine",
            Self::StorageAccount => "Storage Account",
            Self::PostgresServer => "PostgreSQL Server",
            Self::Generic(t) => t,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::ResourceGroup => Capabilities {
                create: true,
                update: false,
                delete: true,
                get_status: false,
            },
            Self::VirtualMachine => Capabilities {
                create: true,
                update: true,
                delete: true,
                get_status: true,
            },
            Self::StorageAccount => Capabilities {
                create: true,
                update: true,
                delete: true,
                get_status: true,
            },
            Self::PostgresServer => Capabilities {
                create: true,
                update: true,
                delete: true,
                get_status: true,
            },
            Self::Generic(_) => Capabilities {
                create: false,
                update: false,
                delete: false,
                get_status: true,
            },
        }
    }

    /// Whether drafts of this kind require an SKU selection
    pub fn requires_sku(&self) -> bool {
        matches!(
            self,
            Self::VirtualMachine | Self::StorageAccount | Self::PostgresServer
        )
    }
}

/// Provider-reported lifecycle state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormalStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
    #[default]
    Unknown,
}

impl FormalStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    /// Parse an ARM power-state code, e.g. `PowerState/running`
    pub fn from_power_state(code: &str) -> Self {
        match code.rsplit('/').next().unwrap_or(code).to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "stopped" | "deallocated" => Self::Stopped,
            "starting" => Self::Starting,
            "stopping" | "deallocating" => Self::Stopping,
            _ => Self::Unknown,
        }
    }

    /// Parse an ARM `provisioningState` for kinds without a power state
    pub fn from_provisioning_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "succeeded" | "ready" | "available" => Self::Running,
            "stopped" | "disabled" => Self::Stopped,
            "creating" | "starting" | "updating" => Self::Starting,
            "deleting" | "stopping" => Self::Stopping,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Stopping => "Stopping",
            Self::Unknown => "Unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Running => "●",
            Self::Stopped => "○",
            Self::Starting | Self::Stopping => "↻",
            Self::Unknown => "?",
        }
    }
}

/// A cloud resource, immutable once materialized from the provider.
///
/// Instances are created from provider responses and discarded when the
/// owning tree node is refreshed or disposed; there is no in-place mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    id: ResourceId,
    name: String,
    kind: ResourceKind,
    status: FormalStatus,
    location: Option<String>,
    sku: Option<String>,
    tags: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>, kind: ResourceKind, status: FormalStatus) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            status,
            location: None,
            sku: None,
            tags: BTreeMap::new(),
        }
    }

    #[allow(dead_code)]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[allow(dead_code)]
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    #[allow(dead_code)]
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Build from an ARM list/get item. Returns None when the item is missing
    /// the fields every ARM resource carries.
    pub fn from_arm_json(item: &Value) -> Option<Self> {
        let id = item.get("id")?.as_str()?;
        let name = item.get("name")?.as_str()?;
        let kind = item
            .get("type")
            .and_then(|v| v.as_str())
            .map(ResourceKind::from_arm_type)
            .unwrap_or(ResourceKind::ResourceGroup);
        let status = item
            .get("properties")
            .and_then(|p| p.get("provisioningState"))
            .and_then(|v| v.as_str())
            .map(FormalStatus::from_provisioning_state)
            .unwrap_or_default();
        let location = item
            .get("location")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let sku = item
            .get("sku")
            .and_then(|s| s.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let tags = item
            .get("tags")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: ResourceId::new(id),
            name: name.to_string(),
            kind,
            status,
            location,
            sku,
            tags,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn status(&self) -> FormalStatus {
        self.status
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VM_ID: &str = "/subscriptions/sub-1/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/web-01";

    #[test]
    fn test_resource_id_segments() {
        let id = ResourceId::new(VM_ID);
        assert_eq!(id.subscription(), Some("sub-1"));
        assert_eq!(id.resource_group(), Some("rg-app"));
        assert_eq!(id.name(), "web-01");
    }

    #[test]
    fn test_resource_id_segment_lookup_is_case_insensitive() {
        let id = ResourceId::new("/subscriptions/sub-1/resourcegroups/rg-app");
        assert_eq!(id.resource_group(), Some("rg-app"));
    }

    #[test]
    fn test_synthetic_ids_never_parse_provider_segments() {
        let id = ResourceId::synthetic("favorites");
        assert!(id.is_synthetic());
        assert_eq!(id.subscription(), None);
    }

    #[test]
    fn test_kind_round_trips_arm_type() {
        let kind = ResourceKind::from_arm_type("Microsoft.Compute/virtualMachines");
        assert_eq!(kind, ResourceKind::VirtualMachine);
        assert_eq!(kind.arm_type(), "Microsoft.Compute/virtualMachines");

        let generic = ResourceKind::from_arm_type("Microsoft.Network/loadBalancers");
        assert!(matches!(generic, ResourceKind::Generic(_)));
        assert!(!generic.capabilities().delete);
    }

    #[test]
    fn test_power_state_parsing() {
        assert!(FormalStatus::from_power_state("PowerState/running").is_running());
        assert!(FormalStatus::from_power_state("PowerState/deallocated").is_stopped());
        assert!(FormalStatus::from_power_state("PowerState/starting").is_transitional());
        assert_eq!(FormalStatus::from_power_state("weird"), FormalStatus::Unknown);
    }

    #[test]
    fn test_resource_from_arm_json() {
        let item = json!({
            "id": VM_ID,
            "name": "web-01",
            "type": "Microsoft.Compute/virtualMachines",
            "location": "westeurope",
            "sku": {"name": "Standard_B2s"},
            "tags": {"env": "prod"},
            "properties": {"provisioningState": "Succeeded"}
        });

        let resource = Resource::from_arm_json(&item).unwrap();
        assert_eq!(resource.name(), "web-01");
        assert_eq!(resource.kind(), &ResourceKind::VirtualMachine);
        assert!(resource.status().is_running());
        assert_eq!(resource.location(), Some("westeurope"));
        assert_eq!(resource.sku(), Some("Standard_B2s"));
        assert_eq!(resource.tags().get("env").map(String::as_str), Some("prod"));

        assert!(Resource::from_arm_json(&json!({"name": "no-id"})).is_none());
    }
}
