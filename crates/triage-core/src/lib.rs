pub mod align;
pub mod artifact;
pub mod catalog;
pub mod sample;

pub use align::align_to_catalog;
pub use artifact::{Artifact, ArtifactError};
pub use catalog::{DEFAULT_LABEL, LabelCatalog};
pub use sample::{ImportanceSample, RouterSample};
