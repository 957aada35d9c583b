use thiserror::Error;

use crate::formulation::Variant;

pub type FlocResult<T> = Result<T, FlocError>;

/// Malformed input data. Nothing sensible can be built from it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataIntegrityError {
    #[error("duplicate facility id: {0}")]
    DuplicateFacility(String),

    #[error("duplicate customer id: {0}")]
    DuplicateCustomer(String),

    #[error("required column '{column}' is missing from the {table} table")]
    MissingColumn { table: &'static str, column: String },

    #[error("invalid value '{value}' in column '{column}' for {id}")]
    InvalidValue {
        id: String,
        column: String,
        value: String,
    },

    #[error("invalid shipping rate: {0}")]
    InvalidShippingRate(f64),

    #[error("cost matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    MatrixDimensions {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("variable names must be unique, {0} was added twice")]
    DuplicateVariable(String),

    #[error("invalid bounds for {name}: [{lb}, {ub}]")]
    InvalidBound { name: String, lb: f64, ub: f64 },

    #[error("constraint {constraint} references unknown variable id[{id}]")]
    UnknownVariable { constraint: String, id: usize },

    #[error("constraint {constraint} has a non-finite coefficient or right-hand side")]
    NonFiniteConstraint { constraint: String },

    #[error("objective coefficient of {0} is not finite")]
    NonFiniteObjective(String),
}

/// The requested variant cannot be formulated from the supplied data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulationError {
    #[error("{0} requires a revenue per unit")]
    MissingRevenue(Variant),

    #[error("revenue per unit must be finite, got {0}")]
    InvalidRevenue(f64),

    #[error(
        "at most {max_open} facilities may open but {customers} customers must be served"
    )]
    FacilityBoundForcesInfeasibility { max_open: usize, customers: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlocError {
    #[error(transparent)]
    Data(#[from] DataIntegrityError),

    #[error(transparent)]
    Formulation(#[from] FormulationError),
}
