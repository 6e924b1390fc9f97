//! Built-in gate stages.

pub mod catalog;
pub mod limits;
pub mod structure;

pub use catalog::CatalogStage;
pub use limits::LimitsStage;
pub use structure::StructureStage;
