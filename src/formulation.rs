//! Facility-location formulations.
//!
//! All variants share one builder. They differ in objective sense, in
//! whether explicit `assign[f,c]` variables exist, in whether service is
//! mandatory and in whether an assigned link must carry at least one unit:
//!
//! | variant                          | sense | assign | service              | min 1 unit |
//! |----------------------------------|-------|--------|----------------------|------------|
//! | `MinCost`                        | min   | no     | demand met exactly   | no         |
//! | `MaxProfitMandatory`             | max   | yes    | exactly one facility | yes        |
//! | `MaxProfitOptional`              | max   | yes    | at most one facility | no         |
//! | `MaxProfitOptionalStrictAssign`  | max   | yes    | at most one facility | yes        |
//!
//! The minimum-one-unit rule makes the model infeasible whenever a customer
//! that must be assigned has a demand below one unit. It is kept as stated;
//! the builder emits a [`BuildWarning`] and the solver reports INFEASIBLE.

use crate::data::Tables;
use crate::error::FormulationError;
use crate::model::{ConstraintOp, Model, Sense, VariableId};
use crate::util::DEMAND_EPS;

use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    MinCost,
    MaxProfitMandatory,
    MaxProfitOptional,
    MaxProfitOptionalStrictAssign,
}

impl Variant {
    pub fn sense(&self) -> Sense {
        match self {
            Variant::MinCost => Sense::Minimize,
            _ => Sense::Maximize,
        }
    }

    pub fn is_profit(&self) -> bool {
        *self != Variant::MinCost
    }

    pub fn has_assignment(&self) -> bool {
        self.is_profit()
    }

    /// Every customer must be served.
    pub fn service_mandatory(&self) -> bool {
        matches!(self, Variant::MinCost | Variant::MaxProfitMandatory)
    }

    /// Shipments must equal demand exactly.
    pub fn demand_met_exactly(&self) -> bool {
        *self == Variant::MinCost
    }

    /// An assigned link must carry at least one unit.
    pub fn min_one_unit(&self) -> bool {
        matches!(
            self,
            Variant::MaxProfitMandatory | Variant::MaxProfitOptionalStrictAssign
        )
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Variant::MinCost => "MinCost",
            Variant::MaxProfitMandatory => "MaxProfitMandatory",
            Variant::MaxProfitOptional => "MaxProfitOptional",
            Variant::MaxProfitOptionalStrictAssign => "MaxProfitOptionalStrictAssign",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulationOptions {
    pub variant: Variant,
    pub max_open_facilities: Option<usize>,
    pub revenue_per_unit: Option<f64>,
}

impl FormulationOptions {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            max_open_facilities: None,
            revenue_per_unit: None,
        }
    }

    pub fn with_max_open_facilities(mut self, max_open: usize) -> Self {
        self.max_open_facilities = Some(max_open);
        self
    }

    pub fn with_revenue_per_unit(mut self, revenue: f64) -> Self {
        self.revenue_per_unit = Some(revenue);
        self
    }
}

/// Model variables behind each decision, indexed by facility then customer
/// in [`Tables`] order.
#[derive(Debug, Clone)]
pub struct DecisionVariables {
    open: Vec<VariableId>,
    ship: Vec<Vec<VariableId>>,
    assign: Option<Vec<Vec<VariableId>>>,
}

impl DecisionVariables {
    pub fn open(&self, f: usize) -> VariableId {
        self.open[f]
    }

    pub fn ship(&self, f: usize, c: usize) -> VariableId {
        self.ship[f][c]
    }

    pub fn assign(&self, f: usize, c: usize) -> Option<VariableId> {
        self.assign.as_ref().map(|assign| assign[f][c])
    }
}

/// Non-fatal findings made while building a model.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// The facilities that may open cannot cover total demand.
    CapacityShortfall {
        available: f64,
        demand: f64,
        max_open: Option<usize>,
    },
    /// The customer must receive at least one unit once assigned, which its
    /// demand cannot accommodate.
    DemandBelowMinimumShipment { customer: String, demand: f64 },
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BuildWarning::CapacityShortfall {
                available,
                demand,
                max_open,
            } => {
                write!(
                    f,
                    "capacity {} of the facilities that may open is below total demand {}",
                    available, demand
                )?;
                if let Some(k) = max_open {
                    write!(f, " (at most {} open)", k)?;
                }
                Ok(())
            }
            BuildWarning::DemandBelowMinimumShipment { customer, demand } => write!(
                f,
                "customer {} has demand {} below the one-unit minimum shipment",
                customer, demand
            ),
        }
    }
}

/// A built model together with the mapping back to facility decisions.
#[derive(Debug, Clone)]
pub struct Formulation {
    options: FormulationOptions,
    model: Model,
    vars: DecisionVariables,
    warnings: Vec<BuildWarning>,
    facility_ids: Vec<String>,
    customer_ids: Vec<String>,
}

impl Formulation {
    pub fn variant(&self) -> Variant {
        self.options.variant
    }

    pub fn options(&self) -> &FormulationOptions {
        &self.options
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn vars(&self) -> &DecisionVariables {
        &self.vars
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Number of facilities and customers the model was built over.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.facility_ids.len(), self.customer_ids.len())
    }

    /// Whether `tables` holds the same facilities and customers, in the same
    /// order, as the tables this formulation was built from.
    pub fn matches(&self, tables: &Tables) -> bool {
        let same = |ids: &[String], other: Vec<&str>| {
            ids.len() == other.len() && ids.iter().zip(other).all(|(a, b)| a == b)
        };

        same(
            &self.facility_ids,
            tables.facilities().iter().map(|f| f.id.as_str()).collect(),
        ) && same(
            &self.customer_ids,
            tables.customers().iter().map(|c| c.id.as_str()).collect(),
        )
    }
}

fn check_options(tables: &Tables, options: &FormulationOptions) -> Result<(), FormulationError> {
    let variant = options.variant;

    if variant.is_profit() {
        match options.revenue_per_unit {
            None => return Err(FormulationError::MissingRevenue(variant)),
            Some(r) if !r.is_finite() => return Err(FormulationError::InvalidRevenue(r)),
            Some(_) => (),
        }
    } else if options.revenue_per_unit.is_some() {
        debug!("{} ignores the revenue per unit", variant);
    }

    if options.max_open_facilities == Some(0)
        && !tables.facilities().is_empty()
        && variant.service_mandatory()
    {
        let customers = tables
            .customers()
            .iter()
            .filter(|c| variant.has_assignment() || c.demand > 0.)
            .count();

        if customers > 0 {
            return Err(FormulationError::FacilityBoundForcesInfeasibility {
                max_open: 0,
                customers,
            });
        }
    }

    Ok(())
}

fn collect_warnings(tables: &Tables, options: &FormulationOptions) -> Vec<BuildWarning> {
    let variant = options.variant;
    let mut warnings = Vec::new();

    if variant.demand_met_exactly() {
        let mut capacities: Vec<f64> = tables.facilities().iter().map(|f| f.capacity).collect();
        capacities.sort_by(|a, b| b.total_cmp(a));

        let k = options
            .max_open_facilities
            .unwrap_or(capacities.len())
            .min(capacities.len());
        let available: f64 = capacities[..k].iter().sum();
        let demand = tables.total_demand();

        if available + DEMAND_EPS < demand {
            warnings.push(BuildWarning::CapacityShortfall {
                available,
                demand,
                max_open: options.max_open_facilities,
            });
        }
    }

    if variant.min_one_unit() {
        for customer in tables.customers() {
            if customer.demand < 1. {
                warnings.push(BuildWarning::DemandBelowMinimumShipment {
                    customer: customer.id.clone(),
                    demand: customer.demand,
                });
            }
        }
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    warnings
}

/// Builds the model for `options.variant` over `tables`.
///
/// # Errors
///
/// Fails if a profit variant has no (finite) revenue per unit, or if the
/// facility bound is zero while some customer must be served.
pub fn build(tables: &Tables, options: &FormulationOptions) -> Result<Formulation, FormulationError> {
    check_options(tables, options)?;

    let variant = options.variant;
    let facilities = tables.facilities();
    let customers = tables.customers();
    let revenue = options.revenue_per_unit.unwrap_or(0.);

    let mut model = Model::new(variant.sense());

    let mut open = Vec::with_capacity(facilities.len());
    for facility in facilities {
        let coeff = if variant.is_profit() {
            -facility.fixed_cost
        } else {
            facility.fixed_cost
        };
        open.push(model.add_binary(format!("open[{}]", facility.id), coeff)?);
    }

    let mut ship = Vec::with_capacity(facilities.len());
    for (f, facility) in facilities.iter().enumerate() {
        let mut row = Vec::with_capacity(customers.len());
        for (c, customer) in customers.iter().enumerate() {
            let cost = tables.transport_cost(f, c);
            let coeff = if variant.is_profit() {
                revenue - cost
            } else {
                cost
            };
            row.push(model.add_nonnegative(
                format!("ship[{},{}]", facility.id, customer.id),
                coeff,
            )?);
        }
        ship.push(row);
    }

    let assign = if variant.has_assignment() {
        let mut assign = Vec::with_capacity(facilities.len());
        for facility in facilities {
            let mut row = Vec::with_capacity(customers.len());
            for customer in customers {
                row.push(model.add_binary(
                    format!("assign[{},{}]", facility.id, customer.id),
                    0.,
                )?);
            }
            assign.push(row);
        }
        Some(assign)
    } else {
        None
    };

    match &assign {
        None => {
            for (c, customer) in customers.iter().enumerate() {
                model.add_constraint(
                    format!("demand[{}]", customer.id),
                    (0..facilities.len()).map(|f| (ship[f][c], 1.)).collect(),
                    ConstraintOp::Eq,
                    customer.demand,
                )?;
            }
        }

        Some(assign) => {
            let op = if variant.service_mandatory() {
                ConstraintOp::Eq
            } else {
                ConstraintOp::Lte
            };

            for (c, customer) in customers.iter().enumerate() {
                model.add_constraint(
                    format!("assign_once[{}]", customer.id),
                    (0..facilities.len()).map(|f| (assign[f][c], 1.)).collect(),
                    op,
                    1.,
                )?;
            }

            for (f, facility) in facilities.iter().enumerate() {
                for (c, customer) in customers.iter().enumerate() {
                    model.add_constraint(
                        format!("ship_if_assigned[{},{}]", facility.id, customer.id),
                        vec![(ship[f][c], 1.), (assign[f][c], -customer.demand)],
                        ConstraintOp::Lte,
                        0.,
                    )?;
                }
            }

            if variant.min_one_unit() {
                for (f, facility) in facilities.iter().enumerate() {
                    for (c, customer) in customers.iter().enumerate() {
                        model.add_constraint(
                            format!("min_shipment[{},{}]", facility.id, customer.id),
                            vec![(ship[f][c], 1.), (assign[f][c], -1.)],
                            ConstraintOp::Gte,
                            0.,
                        )?;
                    }
                }
            }
        }
    }

    for (f, facility) in facilities.iter().enumerate() {
        let mut coeffs: Vec<(VariableId, f64)> = ship[f].iter().map(|&s| (s, 1.)).collect();
        coeffs.push((open[f], -facility.capacity));

        model.add_constraint(
            format!("capacity[{}]", facility.id),
            coeffs,
            ConstraintOp::Lte,
            0.,
        )?;
    }

    if let Some(assign) = &assign {
        for (f, facility) in facilities.iter().enumerate() {
            for (c, customer) in customers.iter().enumerate() {
                model.add_constraint(
                    format!("serve_if_open[{},{}]", facility.id, customer.id),
                    vec![(assign[f][c], 1.), (open[f], -1.)],
                    ConstraintOp::Lte,
                    0.,
                )?;
            }
        }
    }

    if let Some(k) = options.max_open_facilities {
        model.add_constraint(
            "max_open_facilities",
            open.iter().map(|&y| (y, 1.)).collect(),
            ConstraintOp::Lte,
            k as f64,
        )?;
    }

    info!(
        "built {} model with {} variables and {} constraints",
        variant,
        model.variables().len(),
        model.constraints().len()
    );

    let warnings = collect_warnings(tables, options);

    Ok(Formulation {
        options: *options,
        model,
        vars: DecisionVariables { open, ship, assign },
        warnings,
        facility_ids: facilities.iter().map(|f| f.id.clone()).collect(),
        customer_ids: customers.iter().map(|c| c.id.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Customer, Facility};
    use crate::model::VarKind;

    fn tables(demands: &[f64]) -> Tables {
        let facilities = vec![
            Facility::new("F1", 1000., 50.),
            Facility::new("F2", 1200., 60.),
            Facility::new("F3", 1100., 40.),
        ];
        let customers = demands
            .iter()
            .enumerate()
            .map(|(j, &d)| Customer::new(format!("C{}", j + 1), d))
            .collect::<Vec<_>>();
        let distances = vec![1.; facilities.len() * customers.len()];
        Tables::from_distances(facilities, customers, &distances, 1.).unwrap()
    }

    fn count_prefix(model: &Model, prefix: &str) -> usize {
        model
            .constraints()
            .iter()
            .filter(|c| c.name.starts_with(prefix))
            .count()
    }

    #[test]
    fn min_cost_shape() {
        let tables = tables(&[10., 20., 15., 25.]);
        let form = build(&tables, &FormulationOptions::new(Variant::MinCost)).unwrap();
        let model = form.model();

        assert_eq!(model.sense(), Sense::Minimize);
        assert_eq!(model.variables().len(), 3 + 12);
        assert_eq!(count_prefix(model, "demand["), 4);
        assert_eq!(count_prefix(model, "capacity["), 3);
        assert_eq!(model.constraints().len(), 7);
        assert!(form.vars().assign(0, 0).is_none());
        assert!(form.warnings().is_empty());

        let open = model.variable(form.vars().open(1)).unwrap();
        assert_eq!(open.kind, VarKind::Binary);
        assert_eq!(open.obj_coeff, 1200.);
    }

    #[test]
    fn max_profit_mandatory_shape() {
        let tables = tables(&[10., 20., 15., 25.]);
        let options = FormulationOptions::new(Variant::MaxProfitMandatory)
            .with_revenue_per_unit(1000.)
            .with_max_open_facilities(3);
        let form = build(&tables, &options).unwrap();
        let model = form.model();

        assert_eq!(model.sense(), Sense::Maximize);
        assert_eq!(model.variables().len(), 3 + 12 + 12);
        assert_eq!(count_prefix(model, "assign_once["), 4);
        assert_eq!(count_prefix(model, "ship_if_assigned["), 12);
        assert_eq!(count_prefix(model, "min_shipment["), 12);
        assert_eq!(count_prefix(model, "serve_if_open["), 12);
        assert_eq!(count_prefix(model, "max_open_facilities"), 1);
        assert_eq!(model.constraints().len(), 4 + 12 + 12 + 3 + 12 + 1);

        let assign_once = &model.constraints()[0];
        assert_eq!(assign_once.op, ConstraintOp::Eq);

        let ship = model.variable(form.vars().ship(0, 0)).unwrap();
        assert_eq!(ship.obj_coeff, 999.);
        let open = model.variable(form.vars().open(0)).unwrap();
        assert_eq!(open.obj_coeff, -1000.);
    }

    #[test]
    fn optional_variants_relax_assignment() {
        let tables = tables(&[10., 20.]);

        let form = build(
            &tables,
            &FormulationOptions::new(Variant::MaxProfitOptional).with_revenue_per_unit(50.),
        )
        .unwrap();
        assert_eq!(form.model().constraints()[0].op, ConstraintOp::Lte);
        assert_eq!(count_prefix(form.model(), "min_shipment["), 0);

        let form = build(
            &tables,
            &FormulationOptions::new(Variant::MaxProfitOptionalStrictAssign)
                .with_revenue_per_unit(50.),
        )
        .unwrap();
        assert_eq!(form.model().constraints()[0].op, ConstraintOp::Lte);
        assert_eq!(count_prefix(form.model(), "min_shipment["), 6);
    }

    #[test]
    fn profit_without_revenue_fails() {
        let tables = tables(&[10.]);
        let err = build(&tables, &FormulationOptions::new(Variant::MaxProfitOptional)).unwrap_err();
        assert_eq!(err, FormulationError::MissingRevenue(Variant::MaxProfitOptional));

        let err = build(
            &tables,
            &FormulationOptions::new(Variant::MaxProfitMandatory).with_revenue_per_unit(f64::NAN),
        )
        .unwrap_err();
        assert!(matches!(err, FormulationError::InvalidRevenue(_)));
    }

    #[test]
    fn zero_facility_bound_with_mandatory_service_fails() {
        let tables = tables(&[10., 20.]);
        let err = build(
            &tables,
            &FormulationOptions::new(Variant::MinCost).with_max_open_facilities(0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormulationError::FacilityBoundForcesInfeasibility {
                max_open: 0,
                customers: 2
            }
        );

        //optional service tolerates it
        assert!(build(
            &tables,
            &FormulationOptions::new(Variant::MaxProfitOptional)
                .with_revenue_per_unit(10.)
                .with_max_open_facilities(0),
        )
        .is_ok());
    }

    #[test]
    fn capacity_shortfall_is_warned() {
        let tables = tables(&[10., 20., 15., 25.]);
        let form = build(
            &tables,
            &FormulationOptions::new(Variant::MinCost).with_max_open_facilities(1),
        )
        .unwrap();

        assert_eq!(
            form.warnings(),
            &[BuildWarning::CapacityShortfall {
                available: 60.,
                demand: 70.,
                max_open: Some(1)
            }]
        );
    }

    #[test]
    fn fractional_demand_is_warned_under_min_shipment() {
        let tables = tables(&[0.5, 20.]);
        let form = build(
            &tables,
            &FormulationOptions::new(Variant::MaxProfitMandatory).with_revenue_per_unit(1000.),
        )
        .unwrap();

        assert_eq!(
            form.warnings(),
            &[BuildWarning::DemandBelowMinimumShipment {
                customer: "C1".to_string(),
                demand: 0.5
            }]
        );
    }

    #[test]
    fn known_plan_is_feasible() {
        let tables = tables(&[10., 20.]);
        let form = build(&tables, &FormulationOptions::new(Variant::MinCost)).unwrap();
        let vars = form.vars();

        let mut x = vec![0.; form.model().variables().len()];
        x[vars.open(0).index()] = 1.;
        x[vars.ship(0, 0).index()] = 10.;
        x[vars.ship(0, 1).index()] = 20.;
        assert!(form.model().is_feasible(&x));

        x[vars.open(0).index()] = 0.;
        assert!(!form.model().is_feasible(&x));
    }
}
