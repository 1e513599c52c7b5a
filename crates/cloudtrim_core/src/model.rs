//! Analysis data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of billable cloud resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ComputeInstance,
    ObjectStore,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ComputeInstance => "compute-instance",
            ResourceKind::ObjectStore => "object-store",
        }
    }

    /// All kinds, in collection order.
    pub fn all() -> Vec<Self> {
        vec![ResourceKind::ComputeInstance, ResourceKind::ObjectStore]
    }

    /// Whether resources of this kind have a running/stopped lifecycle.
    pub fn has_run_lifecycle(&self) -> bool {
        matches!(self, ResourceKind::ComputeInstance)
    }

    /// Whether the unit price of this kind depends on its subtype.
    pub fn has_subtype_pricing(&self) -> bool {
        matches!(self, ResourceKind::ComputeInstance)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operational status of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    /// Always-on resources such as buckets.
    Active,
    Unknown(String),
}

impl LifecycleState {
    /// Parse a provider state name. Unrecognized names are kept verbatim.
    pub fn from_provider(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "pending" => LifecycleState::Pending,
            "running" => LifecycleState::Running,
            "stopping" => LifecycleState::Stopping,
            "stopped" => LifecycleState::Stopped,
            "shutting-down" => LifecycleState::ShuttingDown,
            "terminated" => LifecycleState::Terminated,
            "active" => LifecycleState::Active,
            _ => LifecycleState::Unknown(state.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Active => "active",
            LifecycleState::Unknown(s) => s,
        }
    }
}

impl From<String> for LifecycleState {
    fn from(s: String) -> Self {
        Self::from_provider(&s)
    }
}

impl From<LifecycleState> for String {
    fn from(state: LifecycleState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One billable cloud resource with its utilization and price facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub kind: ResourceKind,
    pub subtype: String,
    pub lifecycle_state: LifecycleState,
    pub region: String,
    /// Representative utilization (0-100); `None` when the kind has no telemetry.
    pub utilization_pct: Option<f64>,
    /// Hourly price x hours per month; 0 when no pricing data exists.
    pub monthly_cost_estimate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

impl ResourceRecord {
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        subtype: impl Into<String>,
        lifecycle_state: LifecycleState,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            subtype: subtype.into(),
            lifecycle_state,
            region: region.into(),
            utilization_pct: None,
            monthly_cost_estimate: 0.0,
            availability_zone: None,
        }
    }

    pub fn with_utilization(mut self, pct: f64) -> Self {
        self.utilization_pct = Some(pct);
        self
    }

    pub fn with_monthly_cost(mut self, cost: f64) -> Self {
        self.monthly_cost_estimate = cost;
        self
    }

    pub fn with_availability_zone(mut self, zone: impl Into<String>) -> Self {
        self.availability_zone = Some(zone.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle_state == LifecycleState::Running
    }
}

/// What a recommendation asks the operator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Terminate,
    Downsize,
    Investigate,
    General,
}

/// A cost-optimization action and its estimated monthly effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub message: String,
    pub estimated_monthly_savings: f64,
    pub category: RecommendationCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl Recommendation {
    /// A recommendation about one resource.
    pub fn for_resource(
        category: RecommendationCategory,
        resource_id: impl Into<String>,
        message: impl Into<String>,
        savings: f64,
    ) -> Self {
        Self {
            message: message.into(),
            estimated_monthly_savings: savings,
            category,
            resource_id: Some(resource_id.into()),
        }
    }

    /// A region-level advisory with no monetary effect.
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            estimated_monthly_savings: 0.0,
            category: RecommendationCategory::General,
            resource_id: None,
        }
    }

    pub fn is_general(&self) -> bool {
        self.category == RecommendationCategory::General
    }
}

/// Inbound analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Free-text query. Carried for forward compatibility; the rules ignore it.
    pub prompt: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl AnalysisRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub region: String,
    /// Resources in collection order.
    pub resources: Vec<ResourceRecord>,
    /// Resource-specific recommendations first, then the general ones.
    pub recommendations: Vec<Recommendation>,
    pub total_estimated_savings: f64,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn resource_recommendations(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|r| !r.is_general())
    }

    pub fn general_recommendations(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|r| r.is_general())
    }

    /// The recommendation emitted for a resource, if any.
    pub fn recommendation_for(&self, resource_id: &str) -> Option<&Recommendation> {
        self.recommendations
            .iter()
            .find(|r| r.resource_id.as_deref() == Some(resource_id))
    }
}

/// Resource entry of the response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub state: String,
    pub cost_estimate: f64,
    pub utilization: Option<f64>,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az: Option<String>,
}

/// The stable response shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub resources: Vec<ResourceSummary>,
    pub recommendations: Vec<String>,
    pub estimated_savings: f64,
}

impl From<&AnalysisResult> for AnalysisResponse {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            resources: result
                .resources
                .iter()
                .map(|r| ResourceSummary {
                    id: r.id.clone(),
                    resource_type: r.subtype.clone(),
                    state: r.lifecycle_state.to_string(),
                    cost_estimate: r.monthly_cost_estimate,
                    utilization: r.utilization_pct,
                    region: r.region.clone(),
                    az: r.availability_zone.clone(),
                })
                .collect(),
            recommendations: result
                .recommendations
                .iter()
                .map(|r| r.message.clone())
                .collect(),
            estimated_savings: result.total_estimated_savings,
        }
    }
}
