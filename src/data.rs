//! Data serialization.

pub mod evidence;
pub mod yaml;

pub use evidence::{EvidenceBundle, EvidenceInputs, EvidenceMetadata};
pub use yaml::{to_yaml, write_yaml_file};
