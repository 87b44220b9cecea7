//! Engine configuration
//!
//! The state template library, transition base table, behavioral sequence
//! library, and resolver boost weights are immutable configuration: built
//! once at engine construction (from the built-in tables or from JSON),
//! validated, and read-only thereafter. The engine refuses to start without
//! a non-empty template library and transition table.

use crate::error::EngineError;
use crate::types::BehavioralState;
use serde::{Deserialize, Serialize};

/// Configuration schema version embedded in serialized configs.
pub const CONFIG_VERSION: &str = "1";

/// Default minimum evidence a template must accumulate to become a
/// candidate.
pub const DEFAULT_MIN_EVIDENCE: f64 = 0.5;

fn default_min_evidence() -> f64 {
    DEFAULT_MIN_EVIDENCE
}

/// One indicator condition inside a state template. With `max` present the
/// condition is a closed range; otherwise it is a minimum threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCondition {
    /// Indicator name the condition reads
    pub indicator: String,
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive), absent for threshold conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TemplateCondition {
    pub fn threshold(indicator: &str, min: f64) -> Self {
        Self {
            indicator: indicator.to_string(),
            min,
            max: None,
        }
    }

    pub fn range(indicator: &str, min: f64, max: f64) -> Self {
        Self {
            indicator: indicator.to_string(),
            min,
            max: Some(max),
        }
    }

    /// Whether a score satisfies this condition.
    pub fn matches(&self, value: f64) -> bool {
        match self.max {
            Some(max) => value >= self.min && value <= max,
            None => value >= self.min,
        }
    }
}

/// A named rule describing the indicator ranges and trigger keywords that
/// constitute evidence for one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTemplate {
    pub state: BehavioralState,
    pub conditions: Vec<TemplateCondition>,
    /// Keywords substring-matched against recent event targets
    pub trigger_keywords: Vec<String>,
    #[serde(default = "default_min_evidence")]
    pub min_evidence: f64,
}

/// Base transition probabilities out of one state. Successors are kept in
/// declaration order; ties in the final distribution resolve to the earlier
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub from: BehavioralState,
    pub to: Vec<(BehavioralState, f64)>,
}

/// A named reference action sequence with its expected timing profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceTemplate {
    pub name: String,
    pub actions: Vec<String>,
    pub timing_sec: Vec<f64>,
}

/// Indicator weights that boost a candidate of one state during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBoost {
    pub state: BehavioralState,
    pub weights: Vec<(String, f64)>,
}

/// Immutable engine configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: String,
    pub templates: Vec<StateTemplate>,
    pub transitions: Vec<TransitionRow>,
    pub sequences: Vec<SequenceTemplate>,
    pub boosts: Vec<StateBoost>,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

impl EngineConfig {
    /// Built-in configuration tables.
    pub fn builtin() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            templates: builtin_templates(),
            transitions: builtin_transitions(),
            sequences: builtin_sequences(),
            boosts: builtin_boosts(),
        }
    }

    /// Load and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::ConfigError(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. The engine must not start on failure.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.templates.is_empty() {
            return Err(EngineError::ConfigError(
                "template library is empty".to_string(),
            ));
        }
        if self.transitions.is_empty() {
            return Err(EngineError::ConfigError(
                "transition table is empty".to_string(),
            ));
        }
        for template in &self.templates {
            if !(0.0..=1.5).contains(&template.min_evidence) {
                return Err(EngineError::ConfigError(format!(
                    "template {}: min_evidence {} out of range",
                    template.state.as_str(),
                    template.min_evidence
                )));
            }
            for condition in &template.conditions {
                if let Some(max) = condition.max {
                    if max < condition.min {
                        return Err(EngineError::ConfigError(format!(
                            "template {}: condition {} has max < min",
                            template.state.as_str(),
                            condition.indicator
                        )));
                    }
                }
            }
        }
        for row in &self.transitions {
            let mut total = 0.0;
            for (to, p) in &row.to {
                if *p < 0.0 {
                    return Err(EngineError::ConfigError(format!(
                        "transition {} -> {}: negative probability",
                        row.from.as_str(),
                        to.as_str()
                    )));
                }
                total += p;
            }
            if total > 1.0 + 1e-9 {
                return Err(EngineError::ConfigError(format!(
                    "transition row {}: probabilities sum to {total:.3} > 1",
                    row.from.as_str()
                )));
            }
        }
        for sequence in &self.sequences {
            if sequence.actions.len() != sequence.timing_sec.len() {
                return Err(EngineError::ConfigError(format!(
                    "sequence {}: timing length mismatch",
                    sequence.name
                )));
            }
            if sequence.actions.is_empty() {
                return Err(EngineError::ConfigError(format!(
                    "sequence {} is empty",
                    sequence.name
                )));
            }
        }
        for boost in &self.boosts {
            if boost.weights.iter().any(|(_, w)| *w < 0.0) {
                return Err(EngineError::ConfigError(format!(
                    "boost {}: negative weight",
                    boost.state.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Base transition row for a state, if one is configured.
    pub fn transition_row(&self, state: BehavioralState) -> Option<&TransitionRow> {
        self.transitions.iter().find(|r| r.from == state)
    }

    /// Boost weights for a state, if any are configured.
    pub fn boost_for(&self, state: BehavioralState) -> Option<&StateBoost> {
        self.boosts.iter().find(|b| b.state == state)
    }
}

fn builtin_templates() -> Vec<StateTemplate> {
    use BehavioralState::*;
    vec![
        StateTemplate {
            state: Contemplative,
            conditions: vec![
                TemplateCondition::threshold("methodical_reading", 0.5),
                TemplateCondition::range("deep_consideration", 0.2, 1.0),
                TemplateCondition::threshold("session_continuity", 0.2),
                TemplateCondition::range("overwhelmed_scrolling", 0.0, 0.2),
            ],
            trigger_keywords: vec![
                "detail".to_string(),
                "specification".to_string(),
                "compare".to_string(),
            ],
            min_evidence: DEFAULT_MIN_EVIDENCE,
        },
        StateTemplate {
            state: Curious,
            conditions: vec![
                TemplateCondition::threshold("quick_scanning", 0.3),
                TemplateCondition::threshold("session_continuity", 0.2),
                TemplateCondition::range("deep_consideration", 0.05, 0.5),
                TemplateCondition::range("impulsive_behavior", 0.0, 0.5),
            ],
            trigger_keywords: vec![
                "story".to_string(),
                "category".to_string(),
                "discover".to_string(),
            ],
            min_evidence: DEFAULT_MIN_EVIDENCE,
        },
        StateTemplate {
            state: Hesitant,
            conditions: vec![
                TemplateCondition::threshold("hesitant_clicking", 0.6),
                TemplateCondition::range("deep_consideration", 0.4, 0.9),
                TemplateCondition::threshold("methodical_behavior", 0.3),
                TemplateCondition::range("impulsive_behavior", 0.0, 0.4),
            ],
            trigger_keywords: vec![
                "price".to_string(),
                "review".to_string(),
                "guarantee".to_string(),
            ],
            min_evidence: DEFAULT_MIN_EVIDENCE,
        },
        StateTemplate {
            state: Inspired,
            conditions: vec![
                TemplateCondition::threshold("deep_consideration", 0.5),
                TemplateCondition::threshold("session_continuity", 0.6),
                TemplateCondition::threshold("methodical_reading", 0.5),
                TemplateCondition::range("impulsive_behavior", 0.0, 0.3),
            ],
            trigger_keywords: vec![
                "story".to_string(),
                "sustainability".to_string(),
                "craft".to_string(),
            ],
            min_evidence: DEFAULT_MIN_EVIDENCE,
        },
        StateTemplate {
            state: Overwhelmed,
            conditions: vec![
                TemplateCondition::threshold("overwhelmed_scrolling", 0.4),
                TemplateCondition::threshold("quick_scanning", 0.5),
                TemplateCondition::threshold("impulsive_behavior", 0.3),
                TemplateCondition::range("methodical_reading", 0.0, 0.2),
            ],
            trigger_keywords: vec![
                "search".to_string(),
                "filter".to_string(),
                "category".to_string(),
            ],
            min_evidence: DEFAULT_MIN_EVIDENCE,
        },
        StateTemplate {
            state: Confident,
            conditions: vec![
                TemplateCondition::threshold("confident_clicking", 0.6),
                TemplateCondition::threshold("methodical_behavior", 0.3),
                TemplateCondition::threshold("impulsive_behavior", 0.3),
                TemplateCondition::threshold("session_continuity", 0.3),
            ],
            trigger_keywords: vec![
                "cart".to_string(),
                "checkout".to_string(),
                "buy".to_string(),
            ],
            min_evidence: DEFAULT_MIN_EVIDENCE,
        },
    ]
}

fn builtin_transitions() -> Vec<TransitionRow> {
    use BehavioralState::*;
    vec![
        TransitionRow {
            from: Curious,
            to: vec![
                (Contemplative, 0.35),
                (Excited, 0.25),
                (Hesitant, 0.20),
                (Inspired, 0.15),
                (Overwhelmed, 0.05),
            ],
        },
        TransitionRow {
            from: Contemplative,
            to: vec![
                (Confident, 0.30),
                (Doubtful, 0.25),
                (Excited, 0.20),
                (Frustrated, 0.15),
                (Satisfied, 0.10),
            ],
        },
        TransitionRow {
            from: Excited,
            to: vec![
                (Delighted, 0.40),
                (Anticipatory, 0.30),
                (Overwhelmed, 0.15),
                (Confident, 0.15),
            ],
        },
        TransitionRow {
            from: Frustrated,
            to: vec![
                (Doubtful, 0.35),
                (Hesitant, 0.25),
                (Curious, 0.20),
                (Satisfied, 0.20),
            ],
        },
        TransitionRow {
            from: Hesitant,
            to: vec![(Confident, 0.40), (Doubtful, 0.30), (Curious, 0.30)],
        },
        TransitionRow {
            from: Inspired,
            to: vec![(Excited, 0.50), (Confident, 0.30), (Anticipatory, 0.20)],
        },
        TransitionRow {
            from: Overwhelmed,
            to: vec![(Frustrated, 0.40), (Hesitant, 0.35), (Focused, 0.25)],
        },
        TransitionRow {
            from: Confident,
            to: vec![(Excited, 0.45), (Satisfied, 0.35), (Delighted, 0.20)],
        },
    ]
}

fn builtin_sequences() -> Vec<SequenceTemplate> {
    vec![
        SequenceTemplate {
            name: "methodical_researcher".to_string(),
            actions: ["view", "read", "compare", "research", "decide"]
                .map(String::from)
                .to_vec(),
            timing_sec: vec![2.0, 8.0, 12.0, 15.0, 5.0],
        },
        SequenceTemplate {
            name: "impulsive_buyer".to_string(),
            actions: ["view", "like", "add_to_cart"].map(String::from).to_vec(),
            timing_sec: vec![1.0, 0.5, 0.3],
        },
        SequenceTemplate {
            name: "social_validator".to_string(),
            actions: [
                "view",
                "reviews",
                "social_proof",
                "external_validation",
                "decide",
            ]
            .map(String::from)
            .to_vec(),
            timing_sec: vec![2.0, 5.0, 3.0, 8.0, 2.0],
        },
        SequenceTemplate {
            name: "price_optimizer".to_string(),
            actions: [
                "search",
                "filter_price",
                "compare_prices",
                "external_research",
                "negotiate",
            ]
            .map(String::from)
            .to_vec(),
            timing_sec: vec![1.0, 2.0, 8.0, 10.0, 5.0],
        },
        SequenceTemplate {
            name: "experience_seeker".to_string(),
            actions: ["explore", "story", "values", "community", "lifestyle_fit"]
                .map(String::from)
                .to_vec(),
            timing_sec: vec![3.0, 6.0, 4.0, 5.0, 7.0],
        },
    ]
}

fn builtin_boosts() -> Vec<StateBoost> {
    use BehavioralState::*;
    vec![
        StateBoost {
            state: Hesitant,
            weights: vec![
                ("hesitant_clicking".to_string(), 0.5),
                ("deep_consideration".to_string(), 0.3),
            ],
        },
        StateBoost {
            state: Confident,
            weights: vec![
                ("confident_clicking".to_string(), 0.5),
                ("methodical_behavior".to_string(), 0.3),
            ],
        },
        StateBoost {
            state: Overwhelmed,
            weights: vec![("overwhelmed_scrolling".to_string(), 0.6)],
        },
        StateBoost {
            state: Inspired,
            weights: vec![
                ("deep_consideration".to_string(), 0.4),
                ("session_continuity".to_string(), 0.3),
            ],
        },
        StateBoost {
            state: Contemplative,
            weights: vec![
                ("methodical_reading".to_string(), 0.5),
                ("deep_consideration".to_string(), 0.3),
            ],
        },
    ]
}
