use crate::model::{ConstraintOp, Model, Sense, VarKind, VariableId};
use crate::solver::{Solution, SolutionStatus, Solver};
use crate::util::FEASIBILITY_EPS;

use log::{debug, info, trace, warn};
use microlp::{ComparisonOp, OptimizationDirection, Problem};

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

type Outcome = Result<(f64, HashMap<VariableId, f64>), microlp::Error>;

/// Branch-and-bound MILP solver backed by `microlp`.
///
/// With a time limit the search runs on a worker thread; when the budget
/// expires the worker is abandoned and the solve reports
/// [`SolutionStatus::TimeLimitNoSolution`].
///
/// `microlp` cannot be interrupted, so an abandoned worker keeps running its
/// branch and bound to completion. Every timed-out solve leaves one more
/// CPU-bound thread behind until its search ends; callers that retry hard
/// models with short budgets should bound their own retries.
#[derive(Debug, Clone, Default)]
pub struct MicrolpSolver {
    time_limit: Option<Duration>,
}

impl MicrolpSolver {
    pub fn new(time_limit: Option<Duration>) -> Self {
        Self { time_limit }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

impl Solver for MicrolpSolver {
    fn solve(&self, model: &Model) -> Solution {
        info!(
            "solving problem with {} variables and {} constraints",
            model.variables().len(),
            model.constraints().len()
        );

        let (problem, vars) = match translate(model) {
            Ok(translated) => translated,
            Err(status) => {
                info!("problem is {}", status);
                return Solution::without_values(status);
            }
        };

        let start = Instant::now();

        let outcome = match self.time_limit {
            None => run(&problem, &vars),

            Some(limit) => {
                let (tx, rx) = mpsc::channel();

                std::thread::spawn(move || {
                    //the receiver is gone once the time limit expired
                    let _ = tx.send(run(&problem, &vars));
                });

                match rx.recv_timeout(limit) {
                    Ok(outcome) => outcome,

                    Err(RecvTimeoutError::Timeout) => {
                        warn!("no solution found within {:?}", limit);
                        return Solution::without_values(SolutionStatus::TimeLimitNoSolution);
                    }

                    Err(RecvTimeoutError::Disconnected) => {
                        return Solution::without_values(SolutionStatus::Other(
                            "solver thread terminated without a result".to_string(),
                        ));
                    }
                }
            }
        };

        debug!("solve took {:?}", start.elapsed());

        match outcome {
            Ok((obj, values)) => {
                info!("found optimal point with objective value {}", obj);
                trace!("values: {:?}", values);
                Solution::optimal(obj, values)
            }

            Err(microlp::Error::Infeasible) => {
                info!("problem is infeasible");
                Solution::without_values(SolutionStatus::Infeasible)
            }

            Err(microlp::Error::Unbounded) => {
                info!("problem is unbounded");
                Solution::without_values(SolutionStatus::Unbounded)
            }

            Err(err) => {
                warn!("solver failed: {}", err);
                Solution::without_values(SolutionStatus::Other(err.to_string()))
            }
        }
    }
}

/// Translates `model` into a `microlp` problem. A constraint without terms
/// is decided here; if it cannot hold the model is infeasible outright.
fn translate(model: &Model) -> Result<(Problem, Vec<microlp::Variable>), SolutionStatus> {
    let direction = match model.sense() {
        Sense::Minimize => OptimizationDirection::Minimize,
        Sense::Maximize => OptimizationDirection::Maximize,
    };

    let mut problem = Problem::new(direction);

    let vars: Vec<microlp::Variable> = model
        .variables()
        .iter()
        .map(|var| match var.kind {
            VarKind::Binary => problem.add_binary_var(var.obj_coeff),
            VarKind::Integer => {
                let (lb, ub) = var.bound.limits();
                //float to int casts saturate, so infinite bounds become i32 limits
                problem.add_integer_var(var.obj_coeff, (lb.ceil() as i32, ub.floor() as i32))
            }
            VarKind::Continuous => problem.add_var(var.obj_coeff, var.bound.limits()),
        })
        .collect();

    for constraint in model.constraints() {
        let terms: Vec<(microlp::Variable, f64)> = constraint
            .coeffs
            .iter()
            .filter(|(_, coeff)| coeff.abs() > 1e-12)
            .map(|(id, coeff)| (vars[id.index()], *coeff))
            .collect();

        let op = match constraint.op {
            ConstraintOp::Lte => ComparisonOp::Le,
            ConstraintOp::Eq => ComparisonOp::Eq,
            ConstraintOp::Gte => ComparisonOp::Ge,
        };

        if terms.is_empty() {
            let rhs = constraint.rhs;
            let holds = match constraint.op {
                ConstraintOp::Lte => 0. <= rhs + FEASIBILITY_EPS,
                ConstraintOp::Eq => rhs.abs() <= FEASIBILITY_EPS,
                ConstraintOp::Gte => 0. >= rhs - FEASIBILITY_EPS,
            };

            if !holds {
                debug!("constraint {} has no terms and cannot hold", constraint.name);
                return Err(SolutionStatus::Infeasible);
            }

            continue;
        }

        problem.add_constraint(terms, op, constraint.rhs);
    }

    Ok((problem, vars))
}

fn run(problem: &Problem, vars: &[microlp::Variable]) -> Outcome {
    let solution = problem.solve()?;

    let values = vars
        .iter()
        .enumerate()
        .map(|(i, &var)| (VariableId::from(i), solution[var]))
        .collect();

    Ok((solution.objective(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bound;

    #[test]
    fn small_mixed_integer_problem() {
        //maximize x + 2y, x + y <= 4.5, y <= 3, y integer
        let mut model = Model::new(Sense::Maximize);
        let x = model.add_nonnegative("x", 1.).unwrap();
        let y = model
            .add_var("y", VarKind::Integer, Bound::TwoSided(0., 3.), 2.)
            .unwrap();
        model
            .add_constraint("c1", vec![(x, 1.), (y, 1.)], ConstraintOp::Lte, 4.5)
            .unwrap();

        let sol = MicrolpSolver::default().solve(&model);

        assert!(sol.status().is_optimal());
        assert!((sol.obj() - 7.5).abs() < 1e-6);
        assert!((sol.value(y) - 3.).abs() < 1e-6);
        assert!((sol.value(x) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn infeasible_problem() {
        let mut model = Model::new(Sense::Minimize);
        let x = model.add_binary("x", 1.).unwrap();
        model
            .add_constraint("c1", vec![(x, 1.)], ConstraintOp::Gte, 2.)
            .unwrap();

        let sol = MicrolpSolver::default().solve(&model);
        assert_eq!(*sol.status(), SolutionStatus::Infeasible);
    }

    #[test]
    fn empty_constraint_is_decided_directly() {
        let mut model = Model::new(Sense::Minimize);
        model.add_nonnegative("x", 1.).unwrap();
        model
            .add_constraint("never", vec![], ConstraintOp::Eq, 5.)
            .unwrap();

        let sol = MicrolpSolver::default().solve(&model);
        assert_eq!(*sol.status(), SolutionStatus::Infeasible);

        let mut model = Model::new(Sense::Minimize);
        let x = model.add_nonnegative("x", 1.).unwrap();
        model
            .add_constraint("always", vec![], ConstraintOp::Lte, 5.)
            .unwrap();
        model
            .add_constraint("floor", vec![(x, 1.)], ConstraintOp::Gte, 2.)
            .unwrap();

        let sol = MicrolpSolver::new(Some(Duration::from_secs(30))).solve(&model);
        assert!(sol.status().is_optimal());
        assert!((sol.value(x) - 2.).abs() < 1e-6);
    }
}
