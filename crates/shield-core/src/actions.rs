use serde::{Deserialize, Serialize};

/// Filter applied when the verdict asks for filtering but names none.
pub const DEFAULT_FILTER: &str = "tone-down";

/// `applyFilters` as it appears on the wire.
///
/// The classification service has shipped both a boolean flag and the list
/// of filter names in this field; either is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterToggle {
    Flag(bool),
    Names(Vec<String>),
}

impl FilterToggle {
    pub fn is_active(&self) -> bool {
        match self {
            Self::Flag(on) => *on,
            Self::Names(names) => !names.is_empty(),
        }
    }
}

/// The verdict returned by the classification boundary.
///
/// Every field is optional; a missing field means "do nothing for that
/// action". The three mitigations are independent and may all fire together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafetyActions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_speed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_filters: Option<FilterToggle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_warning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
}

impl SafetyActions {
    /// All three mitigations explicitly off.
    pub fn safe_default() -> Self {
        Self {
            reduce_speed: Some(false),
            apply_filters: Some(FilterToggle::Flag(false)),
            show_warning: Some(false),
            ..Self::default()
        }
    }

    pub fn wants_reduced_speed(&self) -> bool {
        self.reduce_speed.unwrap_or(false)
    }

    /// `speedFactor`, or `default` when it is absent, non-finite or not positive.
    pub fn speed_factor_or(&self, default: f64) -> f64 {
        match self.speed_factor {
            Some(f) if f.is_finite() && f > 0.0 => f,
            _ => default,
        }
    }

    pub fn wants_filters(&self) -> bool {
        self.apply_filters
            .as_ref()
            .is_some_and(FilterToggle::is_active)
    }

    /// Filter names in application order.
    ///
    /// `filters` wins; otherwise a list carried in `applyFilters`; otherwise
    /// the tone-down filter alone.
    pub fn filter_names(&self) -> Vec<String> {
        if let Some(filters) = &self.filters {
            return filters.clone();
        }
        match &self.apply_filters {
            Some(FilterToggle::Names(names)) if !names.is_empty() => names.clone(),
            _ => vec![DEFAULT_FILTER.to_string()],
        }
    }

    pub fn wants_warning(&self) -> bool {
        self.show_warning.unwrap_or(false)
    }

    /// `warningMessage`, or `default` when absent or empty.
    pub fn warning_message_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.warning_message.as_deref() {
            Some(msg) if !msg.trim().is_empty() => msg,
            _ => default,
        }
    }

    /// True when no mitigation would fire.
    pub fn is_noop(&self) -> bool {
        !self.wants_reduced_speed() && !self.wants_filters() && !self.wants_warning()
    }
}

/// Reply to an `analyzeVideo` request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub actions: Option<SafetyActions>,
}

impl AnalysisResponse {
    pub fn new(actions: SafetyActions) -> Self {
        Self {
            confidence: None,
            actions: Some(actions),
        }
    }

    /// What the relay answers when the remote service cannot be reached.
    pub fn safe_default() -> Self {
        Self {
            confidence: Some(0.5),
            actions: Some(SafetyActions::safe_default()),
        }
    }
}
