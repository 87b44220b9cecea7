//! State template matching
//!
//! Matches indicator scores and recent event targets against the template
//! library, producing the set of candidate states whose evidence meets
//! their template's minimum. A profile is never state-less: when nothing
//! qualifies, a single default candidate is returned instead.

use crate::config::StateTemplate;
use crate::types::{BehavioralState, CandidateState, IndicatorScores};
use crate::window::EventWindow;

/// Evidence contributed by each satisfied indicator condition.
pub const CONDITION_CREDIT: f64 = 0.25;

/// Evidence contributed by each trigger keyword found in recent targets.
pub const KEYWORD_CREDIT: f64 = 0.2;

/// Number of trailing events whose targets are scanned for keywords.
const KEYWORD_TARGET_LOOKBACK: usize = 3;

/// Evidence assigned to the fallback candidate.
pub const DEFAULT_CANDIDATE_EVIDENCE: f64 = 0.5;

/// Template matcher over one window's scores.
pub struct PatternMatcher;

impl PatternMatcher {
    /// Detect candidate states. Unknown indicator names in a condition read
    /// as score 0 and simply fail to contribute evidence.
    pub fn detect(
        scores: &IndicatorScores,
        window: &EventWindow,
        templates: &[StateTemplate],
    ) -> Vec<CandidateState> {
        let recent_targets = window.recent_targets(KEYWORD_TARGET_LOOKBACK);

        let mut candidates: Vec<CandidateState> = templates
            .iter()
            .filter_map(|template| {
                let evidence = template_evidence(template, scores, &recent_targets);
                (evidence >= template.min_evidence).then_some(CandidateState {
                    state: template.state,
                    evidence,
                })
            })
            .collect();

        if candidates.is_empty() {
            candidates.push(CandidateState {
                state: BehavioralState::DEFAULT,
                evidence: DEFAULT_CANDIDATE_EVIDENCE,
            });
        }

        candidates
    }
}

fn template_evidence(
    template: &StateTemplate,
    scores: &IndicatorScores,
    recent_targets: &[&str],
) -> f64 {
    let mut evidence = 0.0;

    for condition in &template.conditions {
        if condition.matches(scores.get(&condition.indicator)) {
            evidence += CONDITION_CREDIT;
        }
    }

    for keyword in &template.trigger_keywords {
        if recent_targets.iter().any(|t| t.contains(keyword.as_str())) {
            evidence += KEYWORD_CREDIT;
        }
    }

    evidence
}
