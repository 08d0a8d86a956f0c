use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the variant every other arm is compared against.
pub const CONTROL_VARIANT_NAME: &str = "A";

/// Display color used when a variant config carries none.
pub const DEFAULT_VARIANT_COLOR: &str = "#4CAF50";

// ─── Events ─────────────────────────────────────────────────────────────

/// Coarse event kind as recorded by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Impression,
    Conversion,
    /// Legacy vocabulary for a conversion.
    AddToCart,
    Click,
    Other(String),
}

impl EventKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "impression" => EventKind::Impression,
            "conversion" => EventKind::Conversion,
            "add_to_cart" => EventKind::AddToCart,
            "click" => EventKind::Click,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Impression => "impression",
            EventKind::Conversion => "conversion",
            EventKind::AddToCart => "add_to_cart",
            EventKind::Click => "click",
            EventKind::Other(s) => s,
        }
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        EventKind::parse(&raw)
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grouped row from the event source: how many events of `kind`
/// were recorded for `variant_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub variant_id: String,
    pub kind: EventKind,
    pub count: u64,
}

impl EventCount {
    pub fn new(variant_id: impl Into<String>, kind: EventKind, count: u64) -> Self {
        Self {
            variant_id: variant_id.into(),
            kind,
            count,
        }
    }
}

/// A single raw event as persisted by the tracking endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub variant_id: String,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

/// Aggregated counts for one variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCounts {
    pub impressions: u64,
    pub conversions: u64,
}

// ─── Experiments ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl VariantConfig {
    pub fn new(color: &str, text: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            text: Some(text.to_string()),
        }
    }
}

/// One arm of an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub config: VariantConfig,
}

impl Variant {
    pub fn is_control(&self) -> bool {
        self.name == CONTROL_VARIANT_NAME
    }

    pub fn color(&self) -> &str {
        self.config
            .color
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_VARIANT_COLOR)
    }
}

/// A shop's A/B test with its variants in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub shop: String,
    pub name: String,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
}

/// Variant definition for a not-yet-persisted experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub name: String,
    pub config: VariantConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExperiment {
    pub shop: String,
    pub name: String,
    pub variants: Vec<NewVariant>,
}

// ─── Results ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusLabel {
    Control,
    Collecting,
    Winning,
    Losing,
    Promising,
    Underperforming,
    Stable,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusLabel::Control => "Control",
            StatusLabel::Collecting => "Collecting",
            StatusLabel::Winning => "Winning",
            StatusLabel::Losing => "Losing",
            StatusLabel::Promising => "Promising",
            StatusLabel::Underperforming => "Underperforming",
            StatusLabel::Stable => "Stable",
        };
        f.write_str(label)
    }
}

/// Per-variant statistics as rendered by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStat {
    pub id: String,
    pub variant: String,
    pub color: String,
    pub visitors: u64,
    pub conversions: u64,
    /// Percentage, two decimals.
    pub conversion_rate: f64,
    /// Relative change vs control in percent, one decimal.
    pub lift: f64,
    /// 0-100, one decimal.
    pub confidence: f64,
    pub status: StatusLabel,
}
