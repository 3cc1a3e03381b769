//! Object/relationship model over a [`ccm_store`] relational image and a
//! [`ccm_archive`] file tree: the legacy CM backup reader's top-level API
//! (spec.md §4.7-§4.8).

mod algorithms;
mod context;
mod data;
mod error;
#[cfg(test)]
mod fixture;
mod object;
mod structure;

pub use algorithms::{
    diff_project_structure, expand_directory_changes, version_at_timestamp,
    versions_between_objects, ProjectStructureDiff,
};
pub use context::LookupContext;
pub use data::{ExternalRcs, SystemRcs};
pub use error::Error;
pub use object::{AttributeValue, CvType, Object, ObjectId, RelatedAll};
pub use structure::{sorted_entries, structure, ProjectStructure, StructureEntry};
