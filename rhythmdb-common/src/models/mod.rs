//! Shared data model for the analysis pipeline (§3 of the specification).

pub mod creative;
pub mod instrumentation;
pub mod key;
pub mod per_file;
pub mod record;
pub mod store;
pub mod technical;

pub use creative::CreativeFacts;
pub use instrumentation::{
    Boost, Confidence, DecisionTrace, ElectronicElements, EnsembleMode, InstrumentationFacts,
    ModelStats, PerModelStats, RulesStats,
};
pub use key::{key, TrackKey};
pub use per_file::{EnsembleView, PerFileDocument};
pub use record::{AnalysisBlock, TrackRecord};
pub use store::{CriteriaStore, MainStore};
pub use technical::{parse_tbpm, BpmSource, TagMap, TechnicalFacts};
