//! A solver-agnostic description of a linear or mixed-integer program.
//!
//! A [`Model`] is a list of typed variables (each carrying its objective
//! coefficient and bound), an optimization [`Sense`] and an ordered list of
//! named linear constraints. Names are diagnostic labels only; everything
//! else refers to variables through their [`VariableId`].

use crate::error::ModelError;
use crate::util::{feasibility_tolerance, is_integral, FEASIBILITY_EPS};

use std::collections::{HashMap, HashSet};

const LTE_STR: &str = "\u{2264}";
const EQ_STR: &str = "\u{003D}";
const GTE_STR: &str = "\u{2265}";
const INF_STR: &str = "\u{221E}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    sense: Sense,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    var_names: HashSet<String>, //these strings are duplicated in the variables
}

impl Model {
    pub fn new(sense: Sense) -> Self {
        Self {
            sense,
            ..Default::default()
        }
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn variables(&self) -> &[Variable] {
        self.variables.as_slice()
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn constraints(&self) -> &[Constraint] {
        self.constraints.as_slice()
    }

    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        bound: Bound,
        obj_coeff: f64,
    ) -> Result<VariableId, ModelError> {
        let name = name.into();

        let bound = match kind {
            VarKind::Binary => Bound::TwoSided(0., 1.),
            _ => bound,
        };

        if let Bound::TwoSided(lb, ub) = bound {
            if lb > ub {
                return Err(ModelError::InvalidBound { name, lb, ub });
            }
        }

        let bound_valid = match bound {
            Bound::Free => true,
            Bound::Lower(lb) => lb.is_finite(),
            Bound::Upper(ub) => ub.is_finite(),
            Bound::TwoSided(lb, ub) => lb.is_finite() && ub.is_finite(),
            Bound::Fixed(fixed_val) => fixed_val.is_finite(),
        };

        if !bound_valid {
            let (lb, ub) = bound.limits();
            return Err(ModelError::InvalidBound { name, lb, ub });
        }

        if !obj_coeff.is_finite() {
            return Err(ModelError::NonFiniteObjective(name));
        }

        if !self.var_names.insert(name.clone()) {
            return Err(ModelError::DuplicateVariable(name));
        }

        let id = VariableId(self.variables.len());

        self.variables.push(Variable {
            id,
            name,
            kind,
            bound,
            obj_coeff,
        });

        Ok(id)
    }

    pub fn add_binary(
        &mut self,
        name: impl Into<String>,
        obj_coeff: f64,
    ) -> Result<VariableId, ModelError> {
        self.add_var(name, VarKind::Binary, Bound::TwoSided(0., 1.), obj_coeff)
    }

    pub fn add_nonnegative(
        &mut self,
        name: impl Into<String>,
        obj_coeff: f64,
    ) -> Result<VariableId, ModelError> {
        self.add_var(name, VarKind::Continuous, Bound::Lower(0.), obj_coeff)
    }

    /// Appends a named constraint. Repeated terms for the same variable are
    /// merged into a single coefficient, in order of first appearance.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        coeffs: Vec<(VariableId, f64)>,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), ModelError> {
        let name = name.into();

        if let Some((invalid_var, _coeff)) = coeffs
            .iter()
            .find(|(id, _coeff)| id.0 >= self.variables.len())
        {
            return Err(ModelError::UnknownVariable {
                constraint: name,
                id: invalid_var.0,
            });
        }

        if !rhs.is_finite() || coeffs.iter().any(|(_id, coeff)| !coeff.is_finite()) {
            return Err(ModelError::NonFiniteConstraint { constraint: name });
        }

        let mut merged: Vec<(VariableId, f64)> = Vec::with_capacity(coeffs.len());
        let mut position: HashMap<VariableId, usize> = HashMap::new();

        for (id, coeff) in coeffs {
            match position.get(&id) {
                Some(&i) => merged[i].1 += coeff,
                None => {
                    position.insert(id, merged.len());
                    merged.push((id, coeff));
                }
            }
        }

        self.constraints.push(Constraint {
            name,
            coeffs: merged,
            op,
            rhs,
        });

        Ok(())
    }

    /// Objective value of the assignment `value`.
    pub fn objective<F>(&self, value: F) -> f64
    where
        F: Fn(VariableId) -> f64,
    {
        self.variables
            .iter()
            .map(|var| var.obj_coeff * value(var.id))
            .sum()
    }

    /// Every bound, integrality and constraint violation of the assignment
    /// `value`, in declaration order.
    pub fn violations<F>(&self, value: F) -> Vec<Violation>
    where
        F: Fn(VariableId) -> f64,
    {
        let mut violations = Vec::new();

        for var in &self.variables {
            let x = value(var.id);

            if !var.bound.contains(x) {
                violations.push(Violation::Bound {
                    variable: var.name.clone(),
                    value: x,
                    bound: var.bound,
                });
            }

            if var.kind != VarKind::Continuous && !is_integral(x) {
                violations.push(Violation::Integrality {
                    variable: var.name.clone(),
                    value: x,
                });
            }
        }

        for constraint in &self.constraints {
            let lhs = constraint.lhs(&value);

            if !constraint.is_satisfied_by(lhs, constraint.magnitude(&value)) {
                violations.push(Violation::Constraint {
                    constraint: constraint.name.clone(),
                    lhs,
                    op: constraint.op,
                    rhs: constraint.rhs,
                });
            }
        }

        violations
    }

    pub fn is_feasible(&self, x: &[f64]) -> bool {
        if x.len() != self.variables.len() {
            return false;
        }

        self.violations(|id| x[id.0]).is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub kind: VarKind,
    pub bound: Bound,
    pub obj_coeff: f64,
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        //Model add_var guarantees that different variables have different ids
        self.id == other.id
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Free,
    Lower(f64),
    Upper(f64),
    TwoSided(f64, f64),
    Fixed(f64),
}

impl Bound {
    /// `(lower, upper)` with infinities standing in for missing sides.
    pub fn limits(&self) -> (f64, f64) {
        match *self {
            Bound::Free => (f64::NEG_INFINITY, f64::INFINITY),
            Bound::Lower(lb) => (lb, f64::INFINITY),
            Bound::Upper(ub) => (f64::NEG_INFINITY, ub),
            Bound::TwoSided(lb, ub) => (lb, ub),
            Bound::Fixed(val) => (val, val),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        let (lb, ub) = self.limits();
        x >= lb - FEASIBILITY_EPS && x <= ub + FEASIBILITY_EPS
    }

    fn display(&self, f: &mut std::fmt::Formatter, var: &Variable) -> std::fmt::Result {
        match self {
            Bound::Free => write!(f, "{} free", var),
            Bound::Lower(lb) => write!(f, "{} {gte} {}", var, lb, gte = GTE_STR),
            Bound::Upper(ub) => write!(f, "{} {lte} {}", var, ub, lte = LTE_STR),
            Bound::TwoSided(lb, ub) => {
                write!(f, "{} {lte} {} {lte} {}", lb, var, ub, lte = LTE_STR)
            }
            Bound::Fixed(val) => write!(f, "{} {eq} {}", var, val, eq = EQ_STR),
        }
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Bound::Free => write!(f, "(-{inf}, {inf})", inf = INF_STR),
            Bound::Lower(lb) => write!(f, "[{}, {inf})", lb, inf = INF_STR),
            Bound::Upper(ub) => write!(f, "(-{inf}, {}]", ub, inf = INF_STR),
            Bound::TwoSided(lb, ub) => write!(f, "[{}, {}]", lb, ub),
            Bound::Fixed(val) => write!(f, "[{val}, {val}]", val = val),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub coeffs: Vec<(VariableId, f64)>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl Constraint {
    pub fn lhs<F>(&self, value: F) -> f64
    where
        F: Fn(VariableId) -> f64,
    {
        self.coeffs
            .iter()
            .map(|(var, coeff)| coeff * value(*var))
            .sum()
    }

    /// Size of the largest quantity in the row at `value`, the rhs included.
    pub fn magnitude<F>(&self, value: F) -> f64
    where
        F: Fn(VariableId) -> f64,
    {
        self.coeffs
            .iter()
            .map(|(var, coeff)| (coeff * value(*var)).abs())
            .fold(self.rhs.abs(), f64::max)
    }

    fn is_satisfied_by(&self, lhs: f64, magnitude: f64) -> bool {
        let eps = feasibility_tolerance(magnitude);

        match self.op {
            ConstraintOp::Lte => lhs <= self.rhs + eps,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= eps,
            ConstraintOp::Gte => lhs >= self.rhs - eps,
        }
    }

    fn display(
        &self,
        f: &mut std::fmt::Formatter,
        vars: &HashMap<VariableId, &Variable>,
    ) -> std::fmt::Result {
        write!(f, "{}: ", self.name)?;

        for (var_id, coeff) in &self.coeffs {
            if *coeff == 0. {
                continue;
            }

            match vars.get(var_id) {
                Some(var) => write!(
                    f,
                    "{} {} {} ",
                    if *coeff >= 0. { "+" } else { "-" },
                    coeff.abs(),
                    var
                )?,
                None => write!(f, "? ")?,
            }
        }

        write!(f, "{} {}", self.op, self.rhs)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(usize);

impl VariableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::convert::From<usize> for VariableId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

impl std::convert::From<VariableId> for usize {
    fn from(id: VariableId) -> Self {
        id.0
    }
}

impl std::convert::From<&VariableId> for usize {
    fn from(id: &VariableId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    Lte,
    Eq,
    Gte,
}

/// A way in which a variable assignment fails to satisfy a [`Model`].
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Bound {
        variable: String,
        value: f64,
        bound: Bound,
    },
    Integrality {
        variable: String,
        value: f64,
    },
    Constraint {
        constraint: String,
        lhs: f64,
        op: ConstraintOp,
        rhs: f64,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Violation::Bound {
                variable,
                value,
                bound,
            } => write!(f, "{} = {} lies outside {}", variable, value, bound),
            Violation::Integrality { variable, value } => {
                write!(f, "{} = {} is not integral", variable, value)
            }
            Violation::Constraint {
                constraint,
                lhs,
                op,
                rhs,
            } => write!(f, "{}: {} {} {} does not hold", constraint, lhs, op, rhs),
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.sense {
            Sense::Minimize => writeln!(f, "minimize")?,
            Sense::Maximize => writeln!(f, "maximize")?,
        }

        let mut var_id_to_var: HashMap<VariableId, &Variable> = HashMap::new();

        for var in &self.variables {
            var_id_to_var.insert(var.id, var);

            if var.obj_coeff == 0. {
                continue;
            }

            write!(
                f,
                "{} {} {} ",
                if var.obj_coeff > 0. { "+" } else { "-" },
                var.obj_coeff.abs(),
                var
            )?;
        }

        writeln!(f, "\n\nsubject to")?;

        for constraint in &self.constraints {
            constraint.display(f, &var_id_to_var)?;
            writeln!(f)?;
        }

        writeln!(f, "\nwith the bounds")?;

        for var in &self.variables {
            var.bound.display(f, var)?;
            writeln!(f)?;
        }

        let binaries: Vec<&str> = self
            .variables
            .iter()
            .filter(|var| var.kind == VarKind::Binary)
            .map(|var| var.name.as_str())
            .collect();

        if !binaries.is_empty() {
            writeln!(f, "\nbinaries\n{}", binaries.join(" "))?;
        }

        let generals: Vec<&str> = self
            .variables
            .iter()
            .filter(|var| var.kind == VarKind::Integer)
            .map(|var| var.name.as_str())
            .collect();

        if !generals.is_empty() {
            writeln!(f, "\ngenerals\n{}", generals.join(" "))?;
        }

        Ok(())
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl std::fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConstraintOp::Lte => write!(f, "{}", LTE_STR),
            ConstraintOp::Eq => write!(f, "{}", EQ_STR),
            ConstraintOp::Gte => write!(f, "{}", GTE_STR),
        }
    }
}
