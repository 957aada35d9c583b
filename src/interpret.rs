//! Decoding a raw [`Solution`] into an [`AllocationReport`].
//!
//! Interpretation never fails. Anything that does not add up, whether
//! solver noise, a malformed solution or an unserved customer, is
//! enumerated as a [`Warning`] so the caller sees every issue in one pass.
//!
//! The `PartiallyServed` and `EffectivelyUnserved` categories overlap: a
//! customer with positive demand and no shipment at all gets both.

use crate::data::Tables;
use crate::formulation::{BuildWarning, Formulation, Variant};
use crate::model::{ConstraintOp, VarKind, Violation};
use crate::normalize::Diagnostic;
use crate::solver::{Solution, SolutionStatus};
use crate::util::{feasibility_tolerance, is_integral, is_on, DEMAND_EPS, SHIPMENT_EPS};

use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    /// A distance cell was replaced by a sentinel cost.
    DataSubstitution(Diagnostic),
    Formulation(BuildWarning),
    ShipmentFromClosedFacility {
        facility: String,
        customer: String,
        quantity: f64,
        open_value: f64,
    },
    AssignmentToClosedFacility {
        facility: String,
        customer: String,
        assign_value: f64,
        open_value: f64,
    },
    ShipmentWithoutAssignment {
        facility: String,
        customer: String,
        quantity: f64,
        assign_value: f64,
    },
    CapacityExceeded {
        facility: String,
        capacity: f64,
        shipped: f64,
    },
    ConstraintViolated {
        constraint: String,
        lhs: f64,
        op: ConstraintOp,
        rhs: f64,
    },
    FractionalBinary {
        variable: String,
        value: f64,
    },
    PartiallyServed {
        customer: String,
        demand: f64,
        shipped: f64,
    },
    EffectivelyUnserved {
        customer: String,
        demand: f64,
        shipped: f64,
    },
    /// Optional service only: the customer was not assigned at all.
    NotServed {
        customer: String,
        demand: f64,
    },
    /// The formulation was built over other facilities or customers than
    /// the tables given to interpret its solution.
    TablesMismatch {
        formulation: (usize, usize),
        tables: (usize, usize),
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub severity: Severity,
    pub kind: WarningKind,
}

impl Warning {
    fn new(severity: Severity, kind: WarningKind) -> Self {
        Self { severity, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub customer: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacilityAllocation {
    pub facility: String,
    pub capacity: f64,
    pub shipments: Vec<Shipment>,
    pub total_shipped: f64,
}

/// Read-only view of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationReport {
    pub status: SolutionStatus,
    pub variant: Variant,
    pub objective: Option<f64>,
    pub open_facilities: Vec<FacilityAllocation>,
    pub warnings: Vec<Warning>,
}

impl AllocationReport {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    pub fn facility(&self, id: &str) -> Option<&FacilityAllocation> {
        self.open_facilities.iter().find(|f| f.facility == id)
    }

    pub fn warnings_at_least(&self, severity: Severity) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.severity >= severity)
    }

    pub fn has_high_severity(&self) -> bool {
        self.warnings_at_least(Severity::High).next().is_some()
    }
}

/// Builds the report for `solution`, which must come from
/// `formulation.model()` over `tables`.
pub fn interpret(
    solution: &Solution,
    tables: &Tables,
    formulation: &Formulation,
) -> AllocationReport {
    let variant = formulation.variant();

    let mut warnings: Vec<Warning> = tables
        .diagnostics()
        .iter()
        .map(|d| Warning::new(Severity::Medium, WarningKind::DataSubstitution(d.clone())))
        .collect();

    warnings.extend(
        formulation
            .warnings()
            .iter()
            .map(|w| Warning::new(Severity::Medium, WarningKind::Formulation(w.clone()))),
    );

    if !formulation.matches(tables) {
        let kind = WarningKind::TablesMismatch {
            formulation: formulation.dimensions(),
            tables: (tables.facilities().len(), tables.customers().len()),
        };
        warn!("{}", kind);
        warnings.push(Warning::new(Severity::High, kind));

        return AllocationReport {
            status: solution.status().clone(),
            variant,
            objective: None,
            open_facilities: Vec::new(),
            warnings,
        };
    }

    if !solution.status().is_optimal() {
        info!("no allocation to interpret, solver status {}", solution.status());

        return AllocationReport {
            status: solution.status().clone(),
            variant,
            objective: None,
            open_facilities: Vec::new(),
            warnings,
        };
    }

    let facilities = tables.facilities();
    let customers = tables.customers();
    let vars = formulation.vars();

    let open: Vec<bool> = (0..facilities.len())
        .map(|f| is_on(solution.value(vars.open(f))))
        .collect();

    let mut open_facilities = Vec::new();

    for (f, facility) in facilities.iter().enumerate() {
        let mut shipments = Vec::new();
        let mut total_shipped = 0.;

        for (c, customer) in customers.iter().enumerate() {
            let quantity = solution.value(vars.ship(f, c));
            let assigned = vars
                .assign(f, c)
                .map_or(false, |a| is_on(solution.value(a)));

            total_shipped += quantity;

            if open[f] && (quantity > SHIPMENT_EPS || assigned) {
                shipments.push(Shipment {
                    customer: customer.id.clone(),
                    quantity,
                });
            }
        }

        let slack = feasibility_tolerance(facility.capacity.max(total_shipped));
        if total_shipped > facility.capacity + slack {
            warnings.push(Warning::new(
                Severity::High,
                WarningKind::CapacityExceeded {
                    facility: facility.id.clone(),
                    capacity: facility.capacity,
                    shipped: total_shipped,
                },
            ));
        }

        if open[f] {
            open_facilities.push(FacilityAllocation {
                facility: facility.id.clone(),
                capacity: facility.capacity,
                shipments,
                total_shipped,
            });
        }
    }

    check_links(solution, tables, formulation, &open, &mut warnings);
    check_service(solution, tables, formulation, &mut warnings);
    check_model(solution, formulation, &mut warnings);

    for warning in warnings.iter().filter(|w| w.severity == Severity::High) {
        warn!("{}", warning.kind);
    }

    debug!(
        "{} facilities open, {} warnings",
        open_facilities.len(),
        warnings.len()
    );

    AllocationReport {
        status: SolutionStatus::Optimal,
        variant,
        objective: Some(solution.obj()),
        open_facilities,
        warnings,
    }
}

/// Shipments and assignments must only use open facilities, and in
/// assignment variants shipments need an assignment.
fn check_links(
    solution: &Solution,
    tables: &Tables,
    formulation: &Formulation,
    open: &[bool],
    warnings: &mut Vec<Warning>,
) {
    let vars = formulation.vars();

    for (f, facility) in tables.facilities().iter().enumerate() {
        let open_value = solution.value(vars.open(f));

        for (c, customer) in tables.customers().iter().enumerate() {
            let quantity = solution.value(vars.ship(f, c));
            let shipped = quantity > SHIPMENT_EPS;

            if shipped && !open[f] {
                warnings.push(Warning::new(
                    Severity::High,
                    WarningKind::ShipmentFromClosedFacility {
                        facility: facility.id.clone(),
                        customer: customer.id.clone(),
                        quantity,
                        open_value,
                    },
                ));
            }

            if let Some(assign) = vars.assign(f, c) {
                let assign_value = solution.value(assign);

                if is_on(assign_value) && !open[f] {
                    warnings.push(Warning::new(
                        Severity::High,
                        WarningKind::AssignmentToClosedFacility {
                            facility: facility.id.clone(),
                            customer: customer.id.clone(),
                            assign_value,
                            open_value,
                        },
                    ));
                }

                if shipped && !is_on(assign_value) {
                    warnings.push(Warning::new(
                        Severity::High,
                        WarningKind::ShipmentWithoutAssignment {
                            facility: facility.id.clone(),
                            customer: customer.id.clone(),
                            quantity,
                            assign_value,
                        },
                    ));
                }
            }
        }
    }
}

/// Compares what each customer received with its demand. Customers that
/// optional service left unassigned are only noted.
fn check_service(
    solution: &Solution,
    tables: &Tables,
    formulation: &Formulation,
    warnings: &mut Vec<Warning>,
) {
    let variant = formulation.variant();
    let vars = formulation.vars();
    let n_facilities = tables.facilities().len();

    for (c, customer) in tables.customers().iter().enumerate() {
        if !variant.service_mandatory() {
            let assigned = (0..n_facilities).any(|f| {
                vars.assign(f, c)
                    .map_or(false, |a| is_on(solution.value(a)))
            });

            if !assigned {
                if customer.demand > 0. {
                    warnings.push(Warning::new(
                        Severity::Info,
                        WarningKind::NotServed {
                            customer: customer.id.clone(),
                            demand: customer.demand,
                        },
                    ));
                }
                continue;
            }
        }

        let shipped: f64 = (0..n_facilities)
            .map(|f| solution.value(vars.ship(f, c)))
            .sum();

        if shipped < customer.demand - DEMAND_EPS {
            warnings.push(Warning::new(
                Severity::Medium,
                WarningKind::PartiallyServed {
                    customer: customer.id.clone(),
                    demand: customer.demand,
                    shipped,
                },
            ));
        }

        if shipped < SHIPMENT_EPS && customer.demand > 0. {
            warnings.push(Warning::new(
                Severity::Medium,
                WarningKind::EffectivelyUnserved {
                    customer: customer.id.clone(),
                    demand: customer.demand,
                    shipped,
                },
            ));
        }
    }
}

/// Generic checks against the model itself: integrality of binaries and
/// every named constraint.
fn check_model(solution: &Solution, formulation: &Formulation, warnings: &mut Vec<Warning>) {
    let model = formulation.model();

    for var in model.variables() {
        let value = solution.value(var.id);

        if var.kind != VarKind::Continuous && !is_integral(value) {
            warnings.push(Warning::new(
                Severity::Medium,
                WarningKind::FractionalBinary {
                    variable: var.name.clone(),
                    value,
                },
            ));
        }
    }

    for violation in model.violations(|id| solution.value(id)) {
        if let Violation::Constraint {
            constraint,
            lhs,
            op,
            rhs,
        } = violation
        {
            warnings.push(Warning::new(
                Severity::High,
                WarningKind::ConstraintViolated {
                    constraint,
                    lhs,
                    op,
                    rhs,
                },
            ));
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            WarningKind::DataSubstitution(diagnostic) => write!(f, "{}", diagnostic),
            WarningKind::Formulation(warning) => write!(f, "{}", warning),
            WarningKind::ShipmentFromClosedFacility {
                facility,
                customer,
                quantity,
                open_value,
            } => write!(
                f,
                "{} ships {:.3} to {} but is closed (open = {:.3})",
                facility, quantity, customer, open_value
            ),
            WarningKind::AssignmentToClosedFacility {
                facility,
                customer,
                assign_value,
                open_value,
            } => write!(
                f,
                "{} assigned to {} (assign = {:.3}) but {} is closed (open = {:.3})",
                customer, facility, assign_value, facility, open_value
            ),
            WarningKind::ShipmentWithoutAssignment {
                facility,
                customer,
                quantity,
                assign_value,
            } => write!(
                f,
                "{} ships {:.3} to {} without an assignment (assign = {:.3})",
                facility, quantity, customer, assign_value
            ),
            WarningKind::CapacityExceeded {
                facility,
                capacity,
                shipped,
            } => write!(
                f,
                "{} ships {:.3} over its capacity {:.3}",
                facility, shipped, capacity
            ),
            WarningKind::ConstraintViolated {
                constraint,
                lhs,
                op,
                rhs,
            } => write!(f, "constraint {} violated: {} {} {}", constraint, lhs, op, rhs),
            WarningKind::FractionalBinary { variable, value } => {
                write!(f, "{} = {} is not integral", variable, value)
            }
            WarningKind::PartiallyServed {
                customer,
                demand,
                shipped,
            } => write!(
                f,
                "customer {} not fully served (shipped {:.1} / demand {:.1})",
                customer, shipped, demand
            ),
            WarningKind::EffectivelyUnserved {
                customer,
                demand,
                shipped,
            } => write!(
                f,
                "customer {} effectively unserved (shipped {:.1} / demand {:.1})",
                customer, shipped, demand
            ),
            WarningKind::NotServed { customer, demand } => {
                write!(f, "customer {} not served (demand {:.1})", customer, demand)
            }
            WarningKind::TablesMismatch {
                formulation: (mf, mc),
                tables: (tf, tc),
            } => write!(
                f,
                "model built for {} facilities and {} customers cannot be read against tables with {} and {}",
                mf, mc, tf, tc
            ),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Medium => write!(f, "warning"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

impl std::fmt::Display for AllocationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "{} status: {}", self.variant, self.status)?;

        if let Some(obj) = self.objective {
            writeln!(f, "objective: {:.2}", obj)?;
        }

        for alloc in &self.open_facilities {
            writeln!(
                f,
                "facility {} open, shipped {:.1} of {:.1}",
                alloc.facility, alloc.total_shipped, alloc.capacity
            )?;

            for shipment in &alloc.shipments {
                writeln!(f, "  {:.1} to {}", shipment.quantity, shipment.customer)?;
            }
        }

        for warning in &self.warnings {
            writeln!(f, "[{}] {}", warning.severity, warning.kind)?;
        }

        Ok(())
    }
}
