//! Shared vocabulary types used across the dealmemo crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

/// Identifier for one of the six memorandum generation phases.
///
/// Phases run strictly in the order given by [`PhaseId::ALL`]; each phase
/// reads the document merged from every phase before it.
///
/// # Serialization
///
/// `PhaseId` serializes to its snake_case name (e.g., `"data_collection"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PhaseId {
    /// Company, industry and source-material research.
    DataCollection,
    /// Projections, the financial model and return scenarios.
    FinancialModeling,
    /// Risk register and liquidation waterfall.
    RiskAssessment,
    /// Facility terms, pricing, fees, amortization and capital structure.
    DealStructuring,
    /// Covenant package, conditions precedent and reporting.
    CovenantDesign,
    /// Narrative sections and the final recommendation.
    Writing,
}

impl PhaseId {
    /// Every phase in run order.
    pub const ALL: [PhaseId; 6] = [
        PhaseId::DataCollection,
        PhaseId::FinancialModeling,
        PhaseId::RiskAssessment,
        PhaseId::DealStructuring,
        PhaseId::CovenantDesign,
        PhaseId::Writing,
    ];

    /// Returns the canonical snake_case name used in config keys, events and logs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dealmemo_utils::types::PhaseId;
    ///
    /// assert_eq!(PhaseId::DataCollection.as_str(), "data_collection");
    /// assert_eq!(PhaseId::Writing.as_str(), "writing");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DataCollection => "data_collection",
            Self::FinancialModeling => "financial_modeling",
            Self::RiskAssessment => "risk_assessment",
            Self::DealStructuring => "deal_structuring",
            Self::CovenantDesign => "covenant_design",
            Self::Writing => "writing",
        }
    }

    /// Human-readable label used in event messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DataCollection => "Data Collection",
            Self::FinancialModeling => "Financial Modeling",
            Self::RiskAssessment => "Risk Assessment",
            Self::DealStructuring => "Deal Structuring",
            Self::CovenantDesign => "Covenant Design",
            Self::Writing => "Writing",
        }
    }

    /// One-based position in the run.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        Self::ALL
            .iter()
            .position(|p| p == self)
            .map_or(0, |idx| idx + 1)
    }

    /// The phase that runs after this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<PhaseId> {
        Self::ALL.get(self.ordinal()).copied()
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary tools a backend may attach to a single call.
///
/// Backends translate each capability into their own tool or skill
/// declarations and drop the ones they do not support.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCapability {
    /// Grounded web search.
    WebSearch,
    /// Sandboxed code execution.
    CodeExecution,
    /// Spreadsheet analysis and generation.
    Spreadsheets,
    /// PDF and word-processing document analysis and generation.
    Documents,
}

/// Source of a configuration value.
///
/// Precedence, highest first: CLI arguments, environment, config file,
/// programmatic builder, built-in defaults.
///
/// # Example
///
/// ```rust
/// use dealmemo_utils::types::ConfigSource;
///
/// let json = serde_json::to_string(&ConfigSource::Cli).unwrap();
/// assert_eq!(json, r#""cli""#);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument.
    Cli,
    /// Value provided via environment variable.
    Env,
    /// Value loaded from a configuration file.
    Config,
    /// Value set through `ConfigBuilder`.
    Programmatic,
    /// Built-in default.
    Default,
}

impl ConfigSource {
    /// Stable lowercase label for status output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_phase_order_and_next() {
        assert_eq!(PhaseId::DataCollection.ordinal(), 1);
        assert_eq!(PhaseId::Writing.ordinal(), 6);
        assert_eq!(
            PhaseId::DataCollection.next(),
            Some(PhaseId::FinancialModeling)
        );
        assert_eq!(PhaseId::CovenantDesign.next(), Some(PhaseId::Writing));
        assert_eq!(PhaseId::Writing.next(), None);
    }

    #[test]
    fn test_phase_id_parses_config_names() {
        for phase in PhaseId::ALL {
            assert_eq!(PhaseId::from_str(phase.as_str()).unwrap(), phase);
        }
        assert_eq!(
            PhaseId::from_str("Risk_Assessment").unwrap(),
            PhaseId::RiskAssessment
        );
        assert!(PhaseId::from_str("confirmation").is_err());
    }

    #[test]
    fn test_phase_id_serde_matches_as_str() {
        for phase in PhaseId::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.as_str()));
        }
    }

    #[test]
    fn test_tool_capability_names() {
        assert_eq!(ToolCapability::WebSearch.to_string(), "web_search");
        assert_eq!(
            ToolCapability::from_str("spreadsheets").unwrap(),
            ToolCapability::Spreadsheets
        );
        assert_eq!(ToolCapability::VARIANTS.len(), 4);
        assert!(ToolCapability::from_str("browser").is_err());
    }
}
