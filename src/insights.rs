//! Personalization insight generation
//!
//! Deterministic lookup from the resolved profile to a personalization
//! bundle: UI adaptation flags, content tone and interaction style,
//! prioritized information, micro-adaptations, predictive suggestions,
//! journey guidance, and pricing-psychology flags. Every lookup is total;
//! states without a dedicated entry take an explicit default branch.

use crate::types::{
    BehavioralProfile, BehavioralState, ContentTone, IntensityLevel, InteractionStyle,
    JourneyStage, PersonalizationBundle,
};
use std::collections::BTreeMap;

/// Momentum magnitude beyond which journey guidance carries a momentum
/// note.
const MOMENTUM_NOTE_THRESHOLD: f64 = 0.5;

/// Insight generator over resolved profiles.
pub struct InsightGenerator;

impl InsightGenerator {
    pub fn generate(profile: &BehavioralProfile) -> PersonalizationBundle {
        let (ui_adaptations, tone, style, priority_info) = base_personalization(profile.primary_state);

        PersonalizationBundle {
            state: profile.primary_state,
            intensity: profile.intensity,
            confidence: profile.confidence,
            ui_adaptations,
            tone,
            style,
            priority_info,
            micro_adaptations: micro_adaptations(profile),
            predictive_suggestions: predictive_suggestions(profile.predicted_next_state),
            journey_guidance: journey_guidance(profile.journey_stage, profile.momentum),
            pricing_psychology: pricing_psychology(profile.primary_state, profile.intensity),
        }
    }
}

fn flags(names: &[&str]) -> BTreeMap<String, bool> {
    names.iter().map(|n| (n.to_string(), true)).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Base personalization per primary state. States without a dedicated
/// entry take the exploratory defaults.
fn base_personalization(
    state: BehavioralState,
) -> (BTreeMap<String, bool>, ContentTone, InteractionStyle, Vec<String>) {
    match state {
        BehavioralState::Curious => (
            flags(&["show_stories", "highlight_categories", "enable_exploration"]),
            ContentTone::Informative,
            InteractionStyle::Exploratory,
            strings(&["product_story", "craftsmanship_details", "related_products"]),
        ),
        BehavioralState::Contemplative => (
            flags(&["show_details", "enable_comparison", "emphasize_quality"]),
            ContentTone::Thoughtful,
            InteractionStyle::Patient,
            strings(&[
                "detailed_specifications",
                "sustainability_info",
                "long_term_value",
            ]),
        ),
        BehavioralState::Excited | BehavioralState::Delighted => (
            flags(&["emphasize_cta", "show_related", "highlight_benefits"]),
            ContentTone::Enthusiastic,
            InteractionStyle::Responsive,
            strings(&["key_benefits", "immediate_value", "purchase_incentives"]),
        ),
        BehavioralState::Frustrated | BehavioralState::Overwhelmed => (
            flags(&["simplify_navigation", "highlight_search", "show_support"]),
            ContentTone::Supportive,
            InteractionStyle::Helpful,
            strings(&["clear_navigation", "search_assistance", "customer_support"]),
        ),
        BehavioralState::Hesitant | BehavioralState::Doubtful => (
            flags(&["show_reviews", "emphasize_guarantees", "provide_reassurance"]),
            ContentTone::Reassuring,
            InteractionStyle::Supportive,
            strings(&["customer_reviews", "return_policy", "quality_guarantees"]),
        ),
        BehavioralState::Confident | BehavioralState::Satisfied => (
            flags(&[
                "streamline_checkout",
                "show_premium_options",
                "emphasize_exclusivity",
            ]),
            ContentTone::Professional,
            InteractionStyle::Efficient,
            strings(&["premium_features", "exclusive_benefits", "quick_purchase"]),
        ),
        // Inspired, Focused, Anticipatory, Nostalgic
        _ => (
            flags(&["show_stories", "highlight_categories", "enable_exploration"]),
            ContentTone::Informative,
            InteractionStyle::Exploratory,
            strings(&["product_story", "craftsmanship_details", "related_products"]),
        ),
    }
}

/// Micro-adaptations per detected micro-state plus intensity-conditional
/// entries.
fn micro_adaptations(profile: &BehavioralProfile) -> BTreeMap<String, bool> {
    let mut adaptations = BTreeMap::new();

    for state in &profile.micro_states {
        let names: &[&str] = match state {
            BehavioralState::Hesitant => &[
                "show_risk_reducers",
                "emphasize_guarantees",
                "provide_social_proof",
                "offer_consultation",
            ],
            BehavioralState::Inspired => &[
                "highlight_story_elements",
                "show_impact_metrics",
                "enable_sharing_features",
                "suggest_complementary_items",
            ],
            BehavioralState::Overwhelmed => &[
                "simplify_choices",
                "provide_guided_selection",
                "offer_expert_curation",
                "reduce_visual_complexity",
            ],
            BehavioralState::Confident => &[
                "show_premium_options",
                "enable_quick_purchase",
                "highlight_exclusivity",
                "offer_upgrades",
            ],
            _ => &[],
        };
        for name in names {
            adaptations.insert(name.to_string(), true);
        }
    }

    match profile.intensity {
        IntensityLevel::High | IntensityLevel::Extreme => {
            adaptations.insert("increase_visual_emphasis".to_string(), true);
            adaptations.insert("accelerate_interactions".to_string(), true);
        }
        IntensityLevel::Low => {
            adaptations.insert("gentle_guidance".to_string(), true);
            adaptations.insert("patient_pacing".to_string(), true);
        }
        IntensityLevel::Medium => {}
    }

    adaptations
}

/// Preparation suggestions for the predicted next state. States without an
/// entry produce no suggestions.
fn predictive_suggestions(predicted: BehavioralState) -> Vec<String> {
    match predicted {
        BehavioralState::Excited | BehavioralState::Delighted => strings(&[
            "prepare_completion_celebration",
            "surface_bundle_opportunities",
            "enable_social_sharing",
            "highlight_limited_offers",
        ]),
        BehavioralState::Frustrated => strings(&[
            "offer_proactive_assistance",
            "simplify_navigation_paths",
            "surface_search_prominently",
            "expose_support_channels",
        ]),
        BehavioralState::Confident => strings(&[
            "streamline_checkout_flow",
            "surface_premium_upgrades",
            "emphasize_exclusive_benefits",
            "enable_one_click_purchase",
        ]),
        BehavioralState::Contemplative => strings(&[
            "provide_detailed_information",
            "surface_comparison_tools",
            "offer_expert_recommendations",
            "display_long_term_value",
        ]),
        _ => Vec::new(),
    }
}

/// Guidance sentence for the journey stage, with a momentum note when the
/// trajectory is strongly directional.
fn journey_guidance(stage: JourneyStage, momentum: f64) -> String {
    let base = match stage {
        JourneyStage::Discovery => {
            "Welcome the user with curated highlights and clear value propositions"
        }
        JourneyStage::Exploration => {
            "Provide rich content and storytelling to deepen engagement"
        }
        JourneyStage::Consideration => {
            "Offer detailed information and comparison tools to support the decision"
        }
        JourneyStage::Decision => {
            "Reduce friction and provide reassurance to facilitate commitment"
        }
        JourneyStage::Commitment => {
            "Celebrate the choice and suggest complementary experiences"
        }
        JourneyStage::Engagement => {
            "Maintain connection through personalized content and community features"
        }
        JourneyStage::Loyalty => {
            "Recognize the returning relationship and deepen it with tailored experiences"
        }
    };

    if momentum > MOMENTUM_NOTE_THRESHOLD {
        format!("{base}; capitalize on positive momentum with accelerated engagement")
    } else if momentum < -MOMENTUM_NOTE_THRESHOLD {
        format!("{base}; address negative momentum with supportive interventions")
    } else {
        base.to_string()
    }
}

/// Pricing-psychology flags per (primary state, intensity). Combinations
/// without an entry produce no flags.
fn pricing_psychology(
    state: BehavioralState,
    intensity: IntensityLevel,
) -> BTreeMap<String, bool> {
    match (state, intensity) {
        (BehavioralState::Excited, IntensityLevel::High | IntensityLevel::Extreme) => flags(&[
            "emphasize_value",
            "highlight_premium",
            "create_urgency",
        ]),
        (BehavioralState::Hesitant | BehavioralState::Doubtful, _) => flags(&[
            "show_value_breakdown",
            "emphasize_guarantees",
            "display_payment_options",
            "highlight_free_shipping",
        ]),
        (BehavioralState::Contemplative, _) => flags(&[
            "show_cost_per_use",
            "emphasize_longevity",
            "display_total_value",
            "compare_alternatives",
        ]),
        (BehavioralState::Confident, _) => flags(&[
            "show_premium_options",
            "highlight_exclusivity",
            "emphasize_investment",
            "offer_upgrades",
        ]),
        _ => BTreeMap::new(),
    }
}
