use crate::error::DataIntegrityError;
use crate::normalize::Diagnostic;

use nalgebra::DMatrix;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub id: String,
    pub fixed_cost: f64,
    pub capacity: f64,
}

impl Facility {
    pub fn new(id: impl Into<String>, fixed_cost: f64, capacity: f64) -> Self {
        Self {
            id: id.into(),
            fixed_cost,
            capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: String,
    pub demand: f64,
}

impl Customer {
    pub fn new(id: impl Into<String>, demand: f64) -> Self {
        Self {
            id: id.into(),
            demand,
        }
    }
}

/// Normalized, index-stable input data.
///
/// Facilities and customers keep their load order; that order indexes the
/// rows and columns of the transport-cost matrix. Every facility/customer
/// pair has a cost.
#[derive(Debug, Clone)]
pub struct Tables {
    facilities: Vec<Facility>,
    customers: Vec<Customer>,
    transport_cost: DMatrix<f64>,
    diagnostics: Vec<Diagnostic>,
    facility_index: HashMap<String, usize>,
    customer_index: HashMap<String, usize>,
}

impl Tables {
    pub fn new(
        facilities: Vec<Facility>,
        customers: Vec<Customer>,
        transport_cost: DMatrix<f64>,
    ) -> Result<Self, DataIntegrityError> {
        Self::with_diagnostics(facilities, customers, transport_cost, Vec::new())
    }

    /// Builds tables from a facility-by-customer distance matrix given in
    /// row-major order, pricing each unit of distance at `shipping_rate`.
    pub fn from_distances(
        facilities: Vec<Facility>,
        customers: Vec<Customer>,
        distances: &[f64],
        shipping_rate: f64,
    ) -> Result<Self, DataIntegrityError> {
        if !shipping_rate.is_finite() || shipping_rate < 0. {
            return Err(DataIntegrityError::InvalidShippingRate(shipping_rate));
        }

        let rows = facilities.len();
        let cols = customers.len();

        if distances.len() != rows * cols {
            return Err(DataIntegrityError::MatrixDimensions {
                rows: if cols == 0 { 0 } else { distances.len() / cols },
                cols,
                expected_rows: rows,
                expected_cols: cols,
            });
        }

        let transport_cost = DMatrix::from_row_slice(rows, cols, distances) * shipping_rate;
        Self::new(facilities, customers, transport_cost)
    }

    pub(crate) fn with_diagnostics(
        facilities: Vec<Facility>,
        customers: Vec<Customer>,
        transport_cost: DMatrix<f64>,
        diagnostics: Vec<Diagnostic>,
    ) -> Result<Self, DataIntegrityError> {
        if transport_cost.nrows() != facilities.len() || transport_cost.ncols() != customers.len()
        {
            return Err(DataIntegrityError::MatrixDimensions {
                rows: transport_cost.nrows(),
                cols: transport_cost.ncols(),
                expected_rows: facilities.len(),
                expected_cols: customers.len(),
            });
        }

        for facility in &facilities {
            check_value(&facility.id, "fixed_cost", facility.fixed_cost)?;
            check_value(&facility.id, "capacity", facility.capacity)?;
        }

        for customer in &customers {
            check_value(&customer.id, "demand", customer.demand)?;
        }

        for (f, facility) in facilities.iter().enumerate() {
            for (c, customer) in customers.iter().enumerate() {
                check_value(
                    &format!("{}/{}", facility.id, customer.id),
                    "transport_cost",
                    transport_cost[(f, c)],
                )?;
            }
        }

        let mut facility_index = HashMap::with_capacity(facilities.len());
        for (i, facility) in facilities.iter().enumerate() {
            if facility_index.insert(facility.id.clone(), i).is_some() {
                return Err(DataIntegrityError::DuplicateFacility(facility.id.clone()));
            }
        }

        let mut customer_index = HashMap::with_capacity(customers.len());
        for (j, customer) in customers.iter().enumerate() {
            if customer_index.insert(customer.id.clone(), j).is_some() {
                return Err(DataIntegrityError::DuplicateCustomer(customer.id.clone()));
            }
        }

        Ok(Self {
            facilities,
            customers,
            transport_cost,
            diagnostics,
            facility_index,
            customer_index,
        })
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn transport_costs(&self) -> &DMatrix<f64> {
        &self.transport_cost
    }

    /// Per-unit cost of shipping from facility `f` to customer `c`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn transport_cost(&self, f: usize, c: usize) -> f64 {
        self.transport_cost[(f, c)]
    }

    /// Substitutions made while normalizing the raw data.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn facility_index(&self, id: &str) -> Option<usize> {
        self.facility_index.get(id).copied()
    }

    pub fn customer_index(&self, id: &str) -> Option<usize> {
        self.customer_index.get(id).copied()
    }

    pub fn total_demand(&self) -> f64 {
        self.customers.iter().map(|c| c.demand).sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.facilities.iter().map(|f| f.capacity).sum()
    }
}

/// Costs, capacities and demands must be finite and non-negative.
fn check_value(id: &str, column: &str, value: f64) -> Result<(), DataIntegrityError> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(DataIntegrityError::InvalidValue {
            id: id.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}
