//! Core data types
//!
//! This module defines the event model, the closed state/intensity/journey
//! enumerations, and the profile and insight types produced by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context key carrying an observed click-pressure sample, when the
/// instrumentation provides one.
pub const CLICK_PRESSURE_KEY: &str = "click_pressure";

/// Neutral click pressure substituted when no sample was observed.
pub const NEUTRAL_CLICK_PRESSURE: f64 = 0.5;

fn default_duration() -> f64 {
    1.0
}

/// A single timestamped interaction event. Immutable once recorded.
///
/// Optional fields default to documented neutral values, never to
/// fabricated ones: absent dwell and scroll samples are simply excluded
/// from their families' statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Action name (view, hover, click, scroll, search, add_to_cart, ...)
    pub action: String,
    /// Interaction target (page, product, control identifier)
    pub target: String,
    /// Duration of the interaction in seconds (defaults to 1.0)
    #[serde(default = "default_duration")]
    pub duration_sec: f64,
    /// Observed scroll velocity in pixels per second, if measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_velocity: Option<f64>,
    /// Observed dwell time in seconds, if measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwell_time_sec: Option<f64>,
    /// Session this event belongs to
    #[serde(default)]
    pub session_id: String,
    /// Auxiliary numeric context (device signals, pressure samples)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, f64>,
}

impl InteractionEvent {
    /// Click pressure for this event: the observed context sample when
    /// present, otherwise the neutral constant.
    pub fn click_pressure(&self) -> f64 {
        self.context
            .get(CLICK_PRESSURE_KEY)
            .copied()
            .unwrap_or(NEUTRAL_CLICK_PRESSURE)
            .clamp(0.0, 1.0)
    }
}

/// Behavioral/emotional states the engine can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehavioralState {
    Curious,
    Contemplative,
    Excited,
    Frustrated,
    Hesitant,
    Inspired,
    Overwhelmed,
    Confident,
    Nostalgic,
    Anticipatory,
    Satisfied,
    Doubtful,
    Delighted,
    Focused,
}

impl BehavioralState {
    /// Default state used whenever no evidence points anywhere else.
    pub const DEFAULT: BehavioralState = BehavioralState::Curious;

    pub fn as_str(&self) -> &'static str {
        match self {
            BehavioralState::Curious => "curious",
            BehavioralState::Contemplative => "contemplative",
            BehavioralState::Excited => "excited",
            BehavioralState::Frustrated => "frustrated",
            BehavioralState::Hesitant => "hesitant",
            BehavioralState::Inspired => "inspired",
            BehavioralState::Overwhelmed => "overwhelmed",
            BehavioralState::Confident => "confident",
            BehavioralState::Nostalgic => "nostalgic",
            BehavioralState::Anticipatory => "anticipatory",
            BehavioralState::Satisfied => "satisfied",
            BehavioralState::Doubtful => "doubtful",
            BehavioralState::Delighted => "delighted",
            BehavioralState::Focused => "focused",
        }
    }
}

/// Intensity band for a resolved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl IntensityLevel {
    /// Ordinal level (1..=4), used for variance and momentum computation.
    pub fn level(&self) -> i32 {
        match self {
            IntensityLevel::Low => 1,
            IntensityLevel::Medium => 2,
            IntensityLevel::High => 3,
            IntensityLevel::Extreme => 4,
        }
    }

    /// Engagement-equivalent score for session metrics.
    pub fn as_score(&self) -> f64 {
        match self {
            IntensityLevel::Low => 0.2,
            IntensityLevel::Medium => 0.4,
            IntensityLevel::High => 0.7,
            IntensityLevel::Extreme => 1.0,
        }
    }
}

/// Stage of the user's journey, within a session or across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStage {
    Discovery,
    Exploration,
    Consideration,
    Decision,
    Commitment,
    Engagement,
    Loyalty,
}

/// Attention band selected from mean dwell time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DwellBand {
    QuickGlance,
    BriefInterest,
    FocusedAttention,
    DeepEngagement,
    IntensiveAnalysis,
}

/// Direction the dwell-time series is trending across the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DwellTrend {
    EscalatingInterest,
    DiminishingInterest,
    ConsistentEngagement,
    ErraticBehavior,
}

/// Scroll-velocity band, from careful reading to frantic movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBand {
    MethodicalReading,
    CasualScanning,
    ActiveSearching,
    OverwhelmedScrolling,
    FranticBehavior,
}

/// Summary of the dwell-time family for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellSummary {
    /// Band containing the mean dwell time
    pub band: DwellBand,
    /// Trend of the dwell series, when at least 3 samples exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<DwellTrend>,
    /// Mean dwell time in seconds
    pub mean_sec: f64,
    /// Population variance of dwell times
    pub variance: f64,
    /// Band confidence, inversely scaled with variance (0.5..=1.0)
    pub confidence: f64,
}

/// Summary of inter-event timing for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmSummary {
    /// Mean gap between consecutive events in seconds
    pub mean_gap_sec: f64,
    /// Standard deviation of gaps
    pub std_dev_sec: f64,
    /// Median gap
    pub median_gap_sec: f64,
}

impl Default for RhythmSummary {
    /// Neutral rhythm substituted when fewer than two events exist.
    fn default() -> Self {
        Self {
            mean_gap_sec: 2.0,
            std_dev_sec: 1.5,
            median_gap_sec: 2.5,
        }
    }
}

/// Normalized behavioral indicator scores for one window.
///
/// Recomputed fresh on every inference call; every value is clamped to
/// [0, 1]. Unknown indicator names read as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScores {
    /// Named indicator values
    pub values: BTreeMap<String, f64>,
    /// Dwell-time family summary, absent when no dwell samples exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwell: Option<DwellSummary>,
    /// Matched scroll-velocity band, absent when no band qualified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_band: Option<ScrollBand>,
    /// Inter-event rhythm summary
    pub rhythm: RhythmSummary,
}

impl IndicatorScores {
    /// Read an indicator score; missing indicators are neutral 0.0.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Record an indicator score, clamped to [0, 1].
    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value.clamp(0.0, 1.0));
    }
}

/// A state whose template conditions were satisfied, with the evidence
/// accumulated for it. Transient, produced per inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateState {
    pub state: BehavioralState,
    pub evidence: f64,
}

/// Resolved behavioral profile for one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralProfile {
    /// Highest-ranked resolved state
    pub primary_state: BehavioralState,
    /// Second-ranked state (equals primary when only one candidate exists)
    pub secondary_state: BehavioralState,
    /// Intensity band of the primary state
    pub intensity: IntensityLevel,
    /// Confidence in the resolution (0..=1)
    pub confidence: f64,
    /// Consistency of recent profiles (0..=1); 0.5 with short history
    pub stability: f64,
    /// All detected micro-states, strongest first
    pub micro_states: Vec<BehavioralState>,
    /// Next-state distribution; non-negative, sums to 1
    pub transition_probabilities: Vec<(BehavioralState, f64)>,
    /// Signed rate of intensity change across recent profiles (-1..=1)
    pub momentum: f64,
    /// Stage of the in-session journey
    pub journey_stage: JourneyStage,
    /// Argmax of the transition distribution
    pub predicted_next_state: BehavioralState,
    /// Evidence keywords that contributed to the primary state
    pub triggers: Vec<String>,
    /// Timestamp of the newest observed event
    pub observed_at: DateTime<Utc>,
}

/// Aggregate metrics for one session, recomputed from the windowed view of
/// that session on each inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Sum of event durations in seconds
    pub total_duration_sec: f64,
    /// Number of events observed
    pub interaction_count: u32,
    /// Distinct targets touched
    pub unique_targets: u32,
    /// Mean dwell time in seconds (1.0 when no samples exist)
    pub avg_dwell_sec: f64,
    /// Composite engagement score (0..=1)
    pub engagement_score: f64,
    /// Friction cues: cart removals plus repeated searches
    pub friction_events: u32,
}

/// One entry in the per-user session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub metrics: SessionMetrics,
}

/// Loyalty banding derived from the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyIndicators {
    /// Return-frequency band score, by days between sessions
    pub return_frequency: f64,
    /// Engagement-depth band score, by pages and time per session
    pub engagement_depth: f64,
    /// Behavioral-consistency band score, by engagement variance
    pub behavioral_consistency: f64,
    /// Fixed-weight composite of the three bands
    pub composite: f64,
    /// True until a second session has been observed
    pub new_user: bool,
}

/// Forecast for the user's next session, derived from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSessionForecast {
    pub return_probability: f64,
    pub expected_engagement: f64,
    pub conversion_likelihood: f64,
}

/// Cross-session insight. Derived, never stored; recomputed from the
/// session history each time it is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSessionInsight {
    /// Journey stage implied by the session count
    pub journey_stage: JourneyStage,
    /// Stage after each successive session
    pub session_progression: Vec<JourneyStage>,
    pub loyalty: LoyaltyIndicators,
    /// 1 minus mean recent engagement (0..=1)
    pub churn_risk: f64,
    /// Lifetime-value estimate in base currency units
    pub lifetime_value: f64,
    pub forecast: NextSessionForecast,
}

/// Content tone recommended for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTone {
    Informative,
    Thoughtful,
    Enthusiastic,
    Supportive,
    Reassuring,
    Professional,
}

/// Interaction style recommended for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStyle {
    Exploratory,
    Patient,
    Responsive,
    Helpful,
    Supportive,
    Efficient,
}

/// Personalization directives derived from a resolved profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationBundle {
    pub state: BehavioralState,
    pub intensity: IntensityLevel,
    pub confidence: f64,
    /// UI adaptation flags keyed by adaptation name
    pub ui_adaptations: BTreeMap<String, bool>,
    pub tone: ContentTone,
    pub style: InteractionStyle,
    /// Information kinds to surface first, highest priority first
    pub priority_info: Vec<String>,
    /// Finer-grained flags contributed by detected micro-states
    pub micro_adaptations: BTreeMap<String, bool>,
    /// Preparation suggestions for the predicted next state
    pub predictive_suggestions: Vec<String>,
    /// Guidance sentence for the current journey stage
    pub journey_guidance: String,
    /// Pricing-psychology flags keyed by flag name
    pub pricing_psychology: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavioral_state_serializes_snake_case() {
        let json = serde_json::to_string(&BehavioralState::Overwhelmed).unwrap();
        assert_eq!(json, "\"overwhelmed\"");

        let parsed: BehavioralState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, BehavioralState::Overwhelmed);
    }

    #[test]
    fn intensity_levels_are_ordered() {
        assert!(IntensityLevel::Low.level() < IntensityLevel::Medium.level());
        assert!(IntensityLevel::High.level() < IntensityLevel::Extreme.level());
        assert_eq!(IntensityLevel::Extreme.as_score(), 1.0);
    }

    #[test]
    fn event_deserializes_with_defaults() {
        let json = r#"{
            "timestamp": "2024-03-02T10:15:00Z",
            "action": "view",
            "target": "homepage"
        }"#;

        let event: InteractionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.duration_sec, 1.0);
        assert!(event.scroll_velocity.is_none());
        assert!(event.dwell_time_sec.is_none());
        assert_eq!(event.session_id, "");
        assert_eq!(event.click_pressure(), NEUTRAL_CLICK_PRESSURE);
    }

    #[test]
    fn event_click_pressure_reads_context() {
        let json = r#"{
            "timestamp": "2024-03-02T10:15:00Z",
            "action": "click",
            "target": "add_to_cart_button",
            "context": {"click_pressure": 0.9}
        }"#;

        let event: InteractionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.click_pressure(), 0.9);
    }

    #[test]
    fn indicator_scores_clamp_and_default() {
        let mut scores = IndicatorScores::default();
        scores.set("deep_consideration", 1.7);
        scores.set("quick_scanning", -0.4);

        assert_eq!(scores.get("deep_consideration"), 1.0);
        assert_eq!(scores.get("quick_scanning"), 0.0);
        assert_eq!(scores.get("never_recorded"), 0.0);
    }

    #[test]
    fn neutral_rhythm_default() {
        let rhythm = RhythmSummary::default();
        assert_eq!(rhythm.mean_gap_sec, 2.0);
        assert_eq!(rhythm.std_dev_sec, 1.5);
        assert_eq!(rhythm.median_gap_sec, 2.5);
    }
}
