//! BOM derivation engine.
//!
//! Material categories are classified by [`behavior::resolve`] into fixed
//! common, size automatic or color variable categories. The wizard collects
//! three registries (common materials, per-color materials, per-size
//! quantities) and [`assembler::BomAssembler`] crosses them with every size and
//! color combination of a product to produce BOM lines.

pub mod assembler;
pub mod behavior;
pub mod color_map;
pub mod common_registry;
pub mod error;
pub mod gateway;
pub mod session;
pub mod size_matrix;
pub mod types;

pub use assembler::{
    BomAssembler, BomAssembly, BomLine, IncompletenessReport, MissingAssignmentError, MissingKind,
};
pub use behavior::{BehaviorMode, CategoryBehavior, QuantityRule};
pub use color_map::ColorVariationMap;
pub use common_registry::CommonMaterialsRegistry;
pub use error::{BomError, ValidationIssue};
pub use gateway::{BomGateway, GatewayError, HttpBomGateway};
pub use session::{BomWizardSession, InFlightOperations, OperationKind, WizardSettings};
pub use size_matrix::{Completion, SizeConsumptionMatrix, SizeMatrixRowFilter};
