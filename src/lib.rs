//! Resonance Engine - Behavioral state inference for adaptive personalization
//!
//! The engine turns raw interaction events (views, hovers, scrolls, searches,
//! cart actions) into a resolved behavioral profile through a deterministic
//! pipeline: event window → indicator scoring → template matching → state
//! resolution → transition prediction. A parallel aggregation path folds
//! per-session records into journey, loyalty, and lifetime-value insights,
//! and the resolved profile drives a personalization directive bundle.
//!
//! ## Modules
//!
//! - **window**: bounded per-user event history
//! - **scorer**: event window → normalized indicator scores
//! - **matcher**: indicator scores → candidate states via the template library
//! - **resolver**: candidates → primary/secondary state, intensity, stability
//! - **transition**: contextually adjusted next-state probabilities
//! - **sessions**: multi-session journey, loyalty, churn, and value insights
//! - **insights**: resolved profile → personalization directives
//! - **engine**: per-user orchestration and the `analyze` entry point

pub mod config;
pub mod engine;
pub mod error;
pub mod insights;
pub mod matcher;
pub mod report;
pub mod resolver;
pub mod scorer;
pub mod sessions;
pub mod transition;
pub mod types;
pub mod window;

pub use config::EngineConfig;
pub use engine::{analyze_once, AnalysisReport, Engine};
pub use error::EngineError;
pub use insights::InsightGenerator;
pub use report::{OutcomeRecord, ReportEncoder};
pub use types::{
    BehavioralProfile, BehavioralState, CandidateState, IndicatorScores, IntensityLevel,
    InteractionEvent, JourneyStage, MultiSessionInsight, PersonalizationBundle, SessionRecord,
};
pub use window::EventWindow;

/// Engine version embedded in all report payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "resonance-engine";
