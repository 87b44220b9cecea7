//! State transition prediction
//!
//! Starts from the static base transition table, applies additive
//! contextual adjustments keyed on recent actions, and renormalizes so the
//! distribution sums to exactly 1. The predicted next state is the argmax;
//! ties resolve to the earlier table entry.

use crate::config::EngineConfig;
use crate::types::BehavioralState;

/// Added to the Frustrated successor when a recent search occurred.
pub const SEARCH_FRUSTRATION_BOOST: f64 = 0.2;

/// Added to the Confident successor when a recent cart addition occurred.
pub const CART_CONFIDENCE_BOOST: f64 = 0.3;

/// Actions examined for contextual adjustments.
const ADJUSTMENT_LOOKBACK: usize = 3;

/// Transition predictor over the configured base table.
pub struct TransitionPredictor;

impl TransitionPredictor {
    /// Predict the next-state distribution from the current primary state
    /// and the recent action stream.
    ///
    /// A state with no base row and no applicable adjustment yields the
    /// self-loop distribution `{current: 1.0}`, keeping the sums-to-one
    /// invariant total over the state space.
    pub fn predict(
        current: BehavioralState,
        recent_actions: &[&str],
        config: &EngineConfig,
    ) -> (Vec<(BehavioralState, f64)>, BehavioralState) {
        let mut distribution: Vec<(BehavioralState, f64)> = config
            .transition_row(current)
            .map(|row| row.to.clone())
            .unwrap_or_default();

        let recent = &recent_actions[recent_actions.len().saturating_sub(ADJUSTMENT_LOOKBACK)..];

        if recent.contains(&"search") {
            bump(&mut distribution, BehavioralState::Frustrated, SEARCH_FRUSTRATION_BOOST);
        }
        if recent.contains(&"add_to_cart") {
            bump(&mut distribution, BehavioralState::Confident, CART_CONFIDENCE_BOOST);
        }

        if distribution.is_empty() {
            distribution.push((current, 1.0));
        }

        let total: f64 = distribution.iter().map(|(_, p)| p).sum();
        if total > 0.0 {
            for (_, p) in distribution.iter_mut() {
                *p /= total;
            }
        }

        // First strictly-greater entry wins, so ties keep declaration order.
        let mut predicted = current;
        let mut best = f64::NEG_INFINITY;
        for (state, p) in &distribution {
            if *p > best {
                best = *p;
                predicted = *state;
            }
        }

        (distribution, predicted)
    }
}

fn bump(distribution: &mut Vec<(BehavioralState, f64)>, state: BehavioralState, amount: f64) {
    match distribution.iter_mut().find(|(s, _)| *s == state) {
        Some((_, p)) => *p += amount,
        None => distribution.push((state, amount)),
    }
}
