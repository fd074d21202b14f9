//! Evidence derived from a person's commits and the working tree.

pub mod codebase;
pub mod impact;
pub mod initiatives;
pub mod summary;
pub mod themes;

pub use codebase::{CodebaseProfile, CodebaseScanner};
pub use impact::{detect_theme_signals, ImpactEstimator, ImpactHint, ImpactLevel, ThemeSignal};
pub use initiatives::{Initiative, SignalAnalyzer, TimeWindow};
pub use summary::{hot_files, ownership_map, ContributionSummary};
pub use themes::ThemeVocabulary;
