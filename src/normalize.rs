//! Turns raw facility, customer and distance record sets into [`Tables`].
//!
//! Bad distance cells never stop normalization: each one is replaced by a
//! sentinel cost large enough to keep the link out of any optimal plan, and
//! a [`Diagnostic`] naming the facility/customer pair is recorded.

use crate::data::{Customer, Facility, Tables};
use crate::error::DataIntegrityError;

use log::{debug, info, warn};
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Multiplier of the shipping rate used for blank or `NaN` distance cells.
pub const PROHIBITIVE_FACTOR: f64 = 999_999.;

/// Multiplier of the shipping rate used when a distance is unreadable or the
/// lookup is missing altogether.
pub const MISSING_FACTOR: f64 = 9_999_999.;

/// A storage-agnostic record set: a header row and rows of raw cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// The cell at `(row, col)`, or `""` for a short row.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Header names of the required columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnNames {
    pub facility_id: String,
    pub fixed_cost: String,
    pub capacity: String,
    pub customer_id: String,
    pub demand: String,
}

impl std::default::Default for ColumnNames {
    fn default() -> Self {
        Self {
            facility_id: "Facility".to_string(),
            fixed_cost: "Fixed Cost ($)".to_string(),
            capacity: "Capacity (units)".to_string(),
            customer_id: "Customer".to_string(),
            demand: "Demand (units)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    BlankDistance,
    NonNumericDistance,
    InvalidDistance,
    MissingEntry,
}

/// A distance cell that was replaced by a sentinel cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub facility: String,
    pub customer: String,
    pub kind: DiagnosticKind,
    /// The raw cell, absent when the lookup itself failed.
    pub cell: Option<String>,
    pub substituted_cost: f64,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let what = match self.kind {
            DiagnosticKind::BlankDistance => "blank distance",
            DiagnosticKind::NonNumericDistance => "non-numeric distance",
            DiagnosticKind::InvalidDistance => "invalid distance",
            DiagnosticKind::MissingEntry => "no distance entry",
        };

        write!(
            f,
            "{} for facility {} / customer {}",
            what, self.facility, self.customer
        )?;

        if let Some(cell) = &self.cell {
            write!(f, " (found '{}')", cell)?;
        }

        write!(f, ", using cost {}", self.substituted_cost)
    }
}

enum Cell {
    Value(f64),
    Blank,
    NonNumeric,
    Invalid,
}

fn read_cell(raw: &str) -> Cell {
    let raw = raw.trim();

    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Cell::Blank;
    }

    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Cell::Blank,
        Ok(v) if !v.is_finite() || v < 0. => Cell::Invalid,
        Ok(v) => Cell::Value(v),
        Err(_) => Cell::NonNumeric,
    }
}

fn require_column(
    table: &RawTable,
    table_name: &'static str,
    column: &str,
) -> Result<usize, DataIntegrityError> {
    table
        .column(column)
        .ok_or_else(|| DataIntegrityError::MissingColumn {
            table: table_name,
            column: column.to_string(),
        })
}

fn require_value(id: &str, column: &str, raw: &str) -> Result<f64, DataIntegrityError> {
    match read_cell(raw) {
        Cell::Value(v) => Ok(v),
        _ => Err(DataIntegrityError::InvalidValue {
            id: id.to_string(),
            column: column.to_string(),
            value: raw.trim().to_string(),
        }),
    }
}

fn read_facilities(
    raw: &RawTable,
    columns: &ColumnNames,
) -> Result<Vec<Facility>, DataIntegrityError> {
    let id_col = require_column(raw, "facility", &columns.facility_id)?;
    let cost_col = require_column(raw, "facility", &columns.fixed_cost)?;
    let cap_col = require_column(raw, "facility", &columns.capacity)?;

    let mut facilities = Vec::new();

    for row in 0..raw.rows.len() {
        let id = raw.cell(row, id_col).trim();

        if id.is_empty() {
            continue;
        }

        let fixed_cost = require_value(id, &columns.fixed_cost, raw.cell(row, cost_col))?;
        let capacity = require_value(id, &columns.capacity, raw.cell(row, cap_col))?;

        facilities.push(Facility::new(id, fixed_cost, capacity));
    }

    Ok(facilities)
}

fn read_customers(
    raw: &RawTable,
    columns: &ColumnNames,
) -> Result<Vec<Customer>, DataIntegrityError> {
    let id_col = require_column(raw, "customer", &columns.customer_id)?;
    let demand_col = require_column(raw, "customer", &columns.demand)?;

    let mut customers = Vec::new();

    for row in 0..raw.rows.len() {
        let id = raw.cell(row, id_col).trim();

        if id.is_empty() {
            continue;
        }

        let demand = require_value(id, &columns.demand, raw.cell(row, demand_col))?;
        customers.push(Customer::new(id, demand));
    }

    Ok(customers)
}

/// Builds [`Tables`] from raw record sets.
///
/// The distance table is keyed by its facility id column (falling back to
/// its first column) and by customer-id headers. Each distance is multiplied
/// by `shipping_rate`; cells that cannot be used get a sentinel cost and a
/// diagnostic instead.
///
/// # Errors
///
/// Fails on duplicate facility or customer ids, on a missing required
/// column, on an unreadable cost, capacity or demand, and on a negative or
/// non-finite shipping rate.
pub fn normalize(
    facility_rows: &RawTable,
    customer_rows: &RawTable,
    distances: &RawTable,
    shipping_rate: f64,
    columns: &ColumnNames,
) -> Result<Tables, DataIntegrityError> {
    if !shipping_rate.is_finite() || shipping_rate < 0. {
        return Err(DataIntegrityError::InvalidShippingRate(shipping_rate));
    }

    let facilities = read_facilities(facility_rows, columns)?;
    let customers = read_customers(customer_rows, columns)?;

    let key_col = distances.column(&columns.facility_id).unwrap_or(0);

    let mut distance_rows: HashMap<&str, usize> = HashMap::new();
    for row in 0..distances.rows.len() {
        let id = distances.cell(row, key_col).trim();

        if id.is_empty() {
            continue;
        }

        if distance_rows.contains_key(id) {
            debug!("ignoring repeated distance row for facility {}", id);
        } else {
            distance_rows.insert(id, row);
        }
    }

    let customer_cols: Vec<Option<usize>> = customers
        .iter()
        .map(|c| distances.column(&c.id))
        .collect();

    let prohibitive = PROHIBITIVE_FACTOR * shipping_rate;
    let missing = MISSING_FACTOR * shipping_rate;

    let mut transport_cost = DMatrix::zeros(facilities.len(), customers.len());
    let mut diagnostics = Vec::new();

    for (i, facility) in facilities.iter().enumerate() {
        let row = distance_rows.get(facility.id.as_str()).copied();

        for (j, customer) in customers.iter().enumerate() {
            let cell = match (row, customer_cols[j]) {
                (Some(row), Some(col)) => Some(distances.cell(row, col)),
                _ => None,
            };

            let substitution = match cell.map(read_cell) {
                Some(Cell::Value(d)) => {
                    transport_cost[(i, j)] = d * shipping_rate;
                    continue;
                }
                Some(Cell::Blank) => (DiagnosticKind::BlankDistance, prohibitive),
                Some(Cell::NonNumeric) => (DiagnosticKind::NonNumericDistance, missing),
                Some(Cell::Invalid) => (DiagnosticKind::InvalidDistance, missing),
                None => (DiagnosticKind::MissingEntry, missing),
            };

            let (kind, cost) = substitution;
            transport_cost[(i, j)] = cost;

            let diagnostic = Diagnostic {
                facility: facility.id.clone(),
                customer: customer.id.clone(),
                kind,
                cell: cell.map(|s| s.trim().to_string()),
                substituted_cost: cost,
            };

            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
        }
    }

    info!(
        "normalized {} facilities, {} customers ({} substituted costs)",
        facilities.len(),
        customers.len(),
        diagnostics.len()
    );

    Tables::with_diagnostics(facilities, customers, transport_cost, diagnostics)
}
