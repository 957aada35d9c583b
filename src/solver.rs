use crate::model::{Model, VariableId};

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum SolutionStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The time budget ran out before any solution was found.
    TimeLimitNoSolution,
    Other(String),
}

impl SolutionStatus {
    pub fn is_optimal(&self) -> bool {
        *self == SolutionStatus::Optimal
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "OPTIMAL"),
            SolutionStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolutionStatus::Unbounded => write!(f, "UNBOUNDED"),
            SolutionStatus::TimeLimitNoSolution => write!(f, "TIME_LIMIT_NO_SOLUTION"),
            SolutionStatus::Other(msg) => write!(f, "OTHER ({})", msg),
        }
    }
}

/// The outcome of one solve: a status and, when a solution exists, its
/// objective value and variable values.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    status: SolutionStatus,
    obj: f64,
    values: HashMap<VariableId, f64>,
}

impl Solution {
    pub fn new(status: SolutionStatus, obj: f64, values: HashMap<VariableId, f64>) -> Self {
        Self {
            status,
            obj,
            values,
        }
    }

    pub fn optimal(obj: f64, values: HashMap<VariableId, f64>) -> Self {
        Self::new(SolutionStatus::Optimal, obj, values)
    }

    /// A solution carrying only a status.
    pub fn without_values(status: SolutionStatus) -> Self {
        Self::new(status, f64::NAN, HashMap::new())
    }

    pub fn status(&self) -> &SolutionStatus {
        &self.status
    }

    pub fn obj(&self) -> f64 {
        self.obj
    }

    /// Value of `var`; variables the solver did not report read as zero.
    pub fn value(&self, var: VariableId) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.)
    }

    pub fn values(&self) -> &HashMap<VariableId, f64> {
        &self.values
    }
}

/// An optimization engine.
///
/// Implementations must be deterministic for a fixed model and
/// configuration and must always return a definite status. Tie-breaking
/// between alternative optima is up to the engine.
pub trait Solver {
    fn solve(&self, model: &Model) -> Solution;
}
