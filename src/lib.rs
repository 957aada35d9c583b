pub mod data;
mod error;
pub mod formulation;
pub mod interpret;
pub mod model;
pub mod normalize;
mod pipeline;
pub mod solver;
pub mod solvers;
pub mod util;

pub use crate::data::{Customer, Facility, Tables};
pub use crate::error::{DataIntegrityError, FlocError, FlocResult, FormulationError, ModelError};
pub use crate::formulation::{build, BuildWarning, Formulation, FormulationOptions, Variant};
pub use crate::interpret::{
    interpret, AllocationReport, FacilityAllocation, Severity, Shipment, Warning, WarningKind,
};
pub use crate::model::{Bound, Constraint, ConstraintOp, Model, Sense, VarKind, Variable, VariableId};
pub use crate::normalize::{normalize, ColumnNames, Diagnostic, DiagnosticKind, RawTable};
pub use crate::pipeline::plan;
pub use crate::solver::{Solution, SolutionStatus, Solver};
pub use crate::solvers::MicrolpSolver;
