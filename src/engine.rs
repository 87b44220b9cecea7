//! Engine orchestration
//!
//! Owns the per-user state (event window, append-only profile history,
//! session history) and exposes the `analyze` entry point that runs the
//! full inference pipeline: scoring → matching → resolution → transition
//! prediction, with session aggregation and insight generation on top.
//!
//! Users are fully independent: no state is shared between them apart from
//! the read-only configuration tables.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::insights::InsightGenerator;
use crate::matcher::PatternMatcher;
use crate::resolver::StateResolver;
use crate::scorer::IndicatorScorer;
use crate::sessions::SessionAggregator;
use crate::transition::TransitionPredictor;
use crate::types::{
    BehavioralProfile, BehavioralState, IntensityLevel, InteractionEvent, JourneyStage,
    MultiSessionInsight, PersonalizationBundle, SessionMetrics, SessionRecord,
};
use crate::window::EventWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub user_id: String,
    pub session_id: String,
    pub profile: BehavioralProfile,
    /// Windowed view of the analyzed session
    pub session: SessionRecord,
    pub multi_session: MultiSessionInsight,
    pub personalization: PersonalizationBundle,
}

/// Per-user mutable state. Owned exclusively by the engine; one user's
/// histories are never read while resolving another user.
#[derive(Debug, Default)]
struct UserState {
    window: EventWindow,
    /// Append-only; the sole input to stability and momentum
    profiles: Vec<BehavioralProfile>,
    sessions: Vec<SessionRecord>,
}

impl UserState {
    fn new(window: EventWindow) -> Self {
        Self {
            window,
            profiles: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

/// Stateful inference engine.
pub struct Engine {
    config: EngineConfig,
    window_template: EventWindow,
    users: HashMap<String, UserState>,
}

impl Engine {
    /// Create an engine with the built-in configuration.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::builtin())
    }

    /// Create an engine with a custom configuration. Fails when the
    /// configuration is invalid; the engine must not start without a
    /// non-empty template library and transition table.
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            window_template: EventWindow::default(),
            users: HashMap::new(),
        })
    }

    /// Override the per-user window bounds for subsequently seen users.
    pub fn with_window(mut self, max_events: usize, max_age_min: i64) -> Self {
        self.window_template = EventWindow::new(max_events, max_age_min);
        self
    }

    /// Run one inference call for a `(user, session)` pair.
    ///
    /// Idempotent with respect to inputs but not internal history: two
    /// calls with the same events append two profiles and can shift
    /// stability and momentum.
    pub fn analyze(
        &mut self,
        user_id: &str,
        session_id: &str,
        events: Vec<InteractionEvent>,
    ) -> Result<AnalysisReport, EngineError> {
        if user_id.is_empty() {
            return Err(EngineError::InvalidBatch("empty user id".to_string()));
        }

        let window_template = self.window_template.clone();
        let user = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserState::new(window_template));

        for mut event in events {
            if event.session_id.is_empty() {
                event.session_id = session_id.to_string();
            }
            user.window.push(event);
        }

        // History stays monotonically increasing even if a batch arrives
        // with timestamps older than a previous call's.
        let newest = user
            .window
            .newest_timestamp()
            .unwrap_or(DateTime::UNIX_EPOCH);
        let observed_at = match user.profiles.last() {
            Some(last) => newest.max(last.observed_at),
            None => newest,
        };

        let profile = if user.window.is_empty() {
            default_profile(&self.config, observed_at)
        } else {
            let scores = IndicatorScorer::score(&user.window, &self.config.sequences);
            let candidates = PatternMatcher::detect(&scores, &user.window, &self.config.templates);
            let resolution = StateResolver::resolve(
                &candidates,
                &scores,
                &user.window,
                &user.profiles,
                &self.config,
            );
            let recent_actions = user.window.recent_actions(3);
            let (transition_probabilities, predicted_next_state) =
                TransitionPredictor::predict(resolution.primary, &recent_actions, &self.config);

            BehavioralProfile {
                primary_state: resolution.primary,
                secondary_state: resolution.secondary,
                intensity: resolution.intensity,
                confidence: resolution.confidence,
                stability: resolution.stability,
                micro_states: resolution.micro_states,
                transition_probabilities,
                momentum: resolution.momentum,
                journey_stage: resolution.journey_stage,
                predicted_next_state,
                triggers: resolution.triggers,
                observed_at,
            }
        };

        user.profiles.push(profile.clone());

        let session = session_record(&user.window, session_id, &profile, observed_at);
        SessionAggregator::record(&mut user.sessions, session.clone());
        let multi_session = SessionAggregator::insight(&user.sessions);

        let personalization = InsightGenerator::generate(&profile);

        Ok(AnalysisReport {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            profile,
            session,
            multi_session,
            personalization,
        })
    }

    /// Append-only profile history for a user.
    pub fn profile_history(&self, user_id: &str) -> &[BehavioralProfile] {
        self.users
            .get(user_id)
            .map(|u| u.profiles.as_slice())
            .unwrap_or(&[])
    }

    /// Session history for a user.
    pub fn session_history(&self, user_id: &str) -> &[SessionRecord] {
        self.users
            .get(user_id)
            .map(|u| u.sessions.as_slice())
            .unwrap_or(&[])
    }

    /// Recompute the multi-session insight for a user on demand.
    pub fn multi_session_insight(&self, user_id: &str) -> MultiSessionInsight {
        SessionAggregator::insight(self.session_history(user_id))
    }

    /// The active configuration tables.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// One-shot analysis with a throwaway engine and the built-in
/// configuration. History-dependent fields take their neutral defaults.
pub fn analyze_once(
    user_id: &str,
    session_id: &str,
    events: Vec<InteractionEvent>,
) -> Result<AnalysisReport, EngineError> {
    Engine::new()?.analyze(user_id, session_id, events)
}

/// Documented default profile for an empty window: a neutral Curious
/// resolution at medium intensity with base confidence and stability.
fn default_profile(config: &EngineConfig, observed_at: DateTime<Utc>) -> BehavioralProfile {
    let (transition_probabilities, predicted_next_state) =
        TransitionPredictor::predict(BehavioralState::DEFAULT, &[], config);

    BehavioralProfile {
        primary_state: BehavioralState::DEFAULT,
        secondary_state: BehavioralState::DEFAULT,
        intensity: IntensityLevel::Medium,
        confidence: 0.5,
        stability: 0.5,
        micro_states: vec![BehavioralState::DEFAULT],
        transition_probabilities,
        momentum: 0.0,
        journey_stage: JourneyStage::Discovery,
        predicted_next_state,
        triggers: vec!["no_interaction_data".to_string()],
        observed_at,
    }
}

/// Session record over the windowed view of one session.
fn session_record(
    window: &EventWindow,
    session_id: &str,
    profile: &BehavioralProfile,
    observed_at: DateTime<Utc>,
) -> SessionRecord {
    let events = window.session_events(session_id);

    let total_duration_sec: f64 = events.iter().map(|e| e.duration_sec).sum();
    let interaction_count = events.len() as u32;
    let unique_targets = events
        .iter()
        .map(|e| e.target.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len() as u32;

    // Per-event dwell defaults to 1 second when unmeasured.
    let avg_dwell_sec = if events.is_empty() {
        1.0
    } else {
        events
            .iter()
            .map(|e| e.dwell_time_sec.unwrap_or(1.0))
            .sum::<f64>()
            / events.len() as f64
    };

    let searches = events.iter().filter(|e| e.action == "search").count() as u32;
    let removals = events
        .iter()
        .filter(|e| e.action == "remove_from_cart")
        .count() as u32;
    let friction_events = removals + searches.saturating_sub(1);

    let engagement_score = (0.4 * (total_duration_sec / 60.0).min(1.0)
        + 0.3 * (interaction_count as f64 / 20.0).min(1.0)
        + 0.3 * profile.intensity.as_score())
    .clamp(0.0, 1.0);

    let start_time = events
        .first()
        .map(|e| e.timestamp)
        .unwrap_or(observed_at);

    SessionRecord {
        session_id: session_id.to_string(),
        start_time,
        metrics: SessionMetrics {
            total_duration_sec,
            interaction_count,
            unique_targets,
            avg_dwell_sec,
            engagement_score,
            friction_events,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(sec: i64, action: &str, target: &str, dwell: Option<f64>) -> InteractionEvent {
        InteractionEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(sec),
            action: action.to_string(),
            target: target.to_string(),
            duration_sec: dwell.unwrap_or(1.0),
            scroll_velocity: Some(40.0),
            dwell_time_sec: dwell,
            session_id: String::new(),
            context: Default::default(),
        }
    }

    #[test]
    fn empty_batch_returns_default_profile() {
        let mut engine = Engine::new().unwrap();
        let report = engine.analyze("u1", "s1", vec![]).unwrap();

        assert_eq!(report.profile.primary_state, BehavioralState::Curious);
        assert_eq!(report.profile.secondary_state, BehavioralState::Curious);
        assert_eq!(report.profile.confidence, 0.5);
        assert_eq!(report.profile.stability, 0.5);
        assert_eq!(report.profile.journey_stage, JourneyStage::Discovery);

        let total: f64 = report
            .profile
            .transition_probabilities
            .iter()
            .map(|(_, p)| p)
            .sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_user_id_rejected() {
        let mut engine = Engine::new().unwrap();
        assert!(engine.analyze("", "s1", vec![]).is_err());
    }

    #[test]
    fn history_appends_per_call() {
        let mut engine = Engine::new().unwrap();
        let events = vec![
            event(0, "view", "homepage", Some(3.0)),
            event(30, "hover", "mug", Some(4.0)),
        ];

        engine.analyze("u1", "s1", events.clone()).unwrap();
        engine.analyze("u1", "s1", vec![]).unwrap();

        assert_eq!(engine.profile_history("u1").len(), 2);
        // Same session id: history upserts a single record
        assert_eq!(engine.session_history("u1").len(), 1);
    }

    #[test]
    fn new_session_appends_record() {
        let mut engine = Engine::new().unwrap();
        engine
            .analyze("u1", "s1", vec![event(0, "view", "a", Some(2.0))])
            .unwrap();
        engine
            .analyze("u1", "s2", vec![event(600, "view", "b", Some(2.0))])
            .unwrap();

        assert_eq!(engine.session_history("u1").len(), 2);
    }

    #[test]
    fn users_are_independent() {
        let mut engine = Engine::new().unwrap();
        engine
            .analyze("u1", "s1", vec![event(0, "view", "a", Some(2.0))])
            .unwrap();

        assert_eq!(engine.profile_history("u1").len(), 1);
        assert!(engine.profile_history("u2").is_empty());
        assert!(engine.session_history("u2").is_empty());
    }

    #[test]
    fn events_inherit_call_session_id() {
        let mut engine = Engine::new().unwrap();
        let report = engine
            .analyze("u1", "sess-42", vec![event(0, "view", "a", Some(2.0))])
            .unwrap();

        assert_eq!(report.session.session_id, "sess-42");
        assert_eq!(report.session.metrics.interaction_count, 1);
    }

    #[test]
    fn observed_at_is_monotone() {
        let mut engine = Engine::new().unwrap();
        engine
            .analyze("u1", "s1", vec![event(100, "view", "a", Some(2.0))])
            .unwrap();
        // A late-arriving older event must not rewind history
        engine
            .analyze("u1", "s1", vec![event(50, "view", "b", Some(2.0))])
            .unwrap();

        let history = engine.profile_history("u1");
        assert!(history[1].observed_at >= history[0].observed_at);
    }

    #[test]
    fn friction_counts_repeat_searches_and_removals() {
        let mut engine = Engine::new().unwrap();
        let report = engine
            .analyze(
                "u1",
                "s1",
                vec![
                    event(0, "search", "mugs", Some(1.0)),
                    event(10, "search", "ceramic mugs", Some(1.0)),
                    event(20, "remove_from_cart", "mug", Some(1.0)),
                    event(30, "view", "mug", Some(2.0)),
                ],
            )
            .unwrap();

        assert_eq!(report.session.metrics.friction_events, 2);
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let mut config = EngineConfig::builtin();
        config.templates.clear();
        assert!(Engine::with_config(config).is_err());
    }

    #[test]
    fn analyze_once_matches_fresh_engine() {
        let events = vec![
            event(0, "view", "homepage", Some(3.0)),
            event(30, "hover", "mug", Some(5.0)),
            event(60, "click", "details", Some(8.0)),
        ];

        let once = analyze_once("u1", "s1", events.clone()).unwrap();
        let mut engine = Engine::new().unwrap();
        let fresh = engine.analyze("u1", "s1", events).unwrap();

        assert_eq!(once.profile, fresh.profile);
        assert_eq!(once.multi_session, fresh.multi_session);
    }

    #[test]
    fn bundle_reflects_profile() {
        let mut engine = Engine::new().unwrap();
        let report = engine
            .analyze(
                "u1",
                "s1",
                vec![
                    event(0, "view", "homepage", Some(3.0)),
                    event(45, "view", "mug_detail", Some(4.0)),
                    event(90, "view", "mug_specification", Some(3.5)),
                    event(135, "view", "mug_detail", Some(4.5)),
                ],
            )
            .unwrap();

        assert_eq!(report.personalization.state, report.profile.primary_state);
        assert_eq!(report.personalization.intensity, report.profile.intensity);
        assert_eq!(
            report.personalization.confidence,
            report.profile.confidence
        );
    }
}
