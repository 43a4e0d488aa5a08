//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the prediction core and the fitted artifacts it consumes.

mod artifact_store;
mod classifier;
mod transform;

pub use artifact_store::{ArtifactError, ArtifactStore, Artifacts};
pub use classifier::{AttributionError, Attributor, Classifier, FittedModel, ModelError};
pub use transform::{CategoricalEncoder, ContinuousScaler, TransformError};
