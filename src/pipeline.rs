use crate::data::Tables;
use crate::error::FormulationError;
use crate::formulation::{build, FormulationOptions};
use crate::interpret::{interpret, AllocationReport};
use crate::solver::Solver;

use log::info;

/// Builds the model for `options`, solves it with `solver` and interprets
/// the result.
///
/// A solve that ends without an optimal solution is not an error; the
/// report carries the status. Nothing is retried.
pub fn plan<S>(
    tables: &Tables,
    options: &FormulationOptions,
    solver: &S,
) -> Result<AllocationReport, FormulationError>
where
    S: Solver + ?Sized,
{
    let formulation = build(tables, options)?;
    let solution = solver.solve(formulation.model());

    info!("{} solve finished with status {}", options.variant, solution.status());

    Ok(interpret(&solution, tables, &formulation))
}
