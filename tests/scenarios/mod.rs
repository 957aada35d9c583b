use floc::*;

const EPS: f64 = 0.0001;

pub fn assert_optimal_obj(report: &AllocationReport, expected_obj: f64) {
    match report.objective {
        Some(obj) if report.is_optimal() => {
            assert!(
                (obj - expected_obj).abs() < EPS,
                "obj: {}, expected: {}",
                obj,
                expected_obj
            );
        }

        _ => panic!("not optimal: {}", report),
    }
}

pub fn assert_infeasible(report: &AllocationReport) {
    match report.status {
        SolutionStatus::Infeasible => {
            assert!(report.objective.is_none());
            assert!(report.open_facilities.is_empty());
        }
        _ => panic!("not infeasible: {}", report),
    }
}

pub fn assert_open(report: &AllocationReport, expected: &[&str]) {
    let open: Vec<&str> = report
        .open_facilities
        .iter()
        .map(|f| f.facility.as_str())
        .collect();
    assert_eq!(open, expected);
}

pub fn assert_no_warnings_at_least(report: &AllocationReport, severity: Severity) {
    let warnings: Vec<&Warning> = report.warnings_at_least(severity).collect();
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
}

/// Capacity, consistency and facility-count invariants of an optimal plan.
pub fn assert_plan_invariants(report: &AllocationReport, max_open: Option<usize>) {
    assert!(!report.has_high_severity(), "{}", report);

    for alloc in &report.open_facilities {
        let shipped: f64 = alloc.shipments.iter().map(|s| s.quantity).sum();
        assert!((shipped - alloc.total_shipped).abs() < EPS);
        assert!(
            alloc.total_shipped <= alloc.capacity + 1e-6,
            "{} ships {} over capacity {}",
            alloc.facility,
            alloc.total_shipped,
            alloc.capacity
        );
    }

    if let Some(k) = max_open {
        assert!(report.open_facilities.len() <= k);
    }
}

/// Every customer receives exactly its demand from the open facilities.
pub fn assert_demand_met(report: &AllocationReport, tables: &Tables) {
    for customer in tables.customers() {
        let received: f64 = report
            .open_facilities
            .iter()
            .flat_map(|f| f.shipments.iter())
            .filter(|s| s.customer == customer.id)
            .map(|s| s.quantity)
            .sum();

        assert!(
            (received - customer.demand).abs() < 1e-3,
            "customer {} received {}, demand {}",
            customer.id,
            received,
            customer.demand
        );
    }
}

pub fn count_warnings<F>(report: &AllocationReport, pred: F) -> usize
where
    F: Fn(&WarningKind) -> bool,
{
    report.warnings.iter().filter(|w| pred(&w.kind)).count()
}

pub struct TestScenario {
    pub tables: Tables,
    pub options: FormulationOptions,
    pub check_report: Box<dyn FnOnce(&AllocationReport, &Tables)>,
}

impl TestScenario {
    fn new<F: FnOnce(&AllocationReport, &Tables) + 'static>(
        tables: Tables,
        options: FormulationOptions,
        check_report: F,
    ) -> Self {
        Self {
            tables,
            options,
            check_report: Box::new(check_report),
        }
    }
}

pub const DISTANCES: [f64; 12] = [
    4., 6., 9., 5., //
    5., 4., 7., 6., //
    6., 3., 4., 7., //
];

pub fn lab_facilities() -> Vec<Facility> {
    vec![
        Facility::new("F1", 1000., 50.),
        Facility::new("F2", 1200., 60.),
        Facility::new("F3", 1100., 40.),
    ]
}

pub fn lab_customers(demands: [f64; 4]) -> Vec<Customer> {
    demands
        .iter()
        .enumerate()
        .map(|(j, &d)| Customer::new(format!("C{}", j + 1), d))
        .collect()
}

pub fn lab_tables(demands: [f64; 4]) -> Tables {
    Tables::from_distances(lab_facilities(), lab_customers(demands), &DISTANCES, 1.).unwrap()
}

/// The lab data as raw record sets, with the F2/C2 distance cell left blank.
pub fn lab_raw_tables_with_blank() -> (RawTable, RawTable, RawTable) {
    let facilities = RawTable::new(
        vec!["Facility", "Fixed Cost ($)", "Capacity (units)"],
        vec![
            vec!["F1", "1000", "50"],
            vec!["F2", "1200", "60"],
            vec!["F3", "1100", "40"],
            vec!["", "", ""],
        ],
    );

    let customers = RawTable::new(
        vec!["Customer", "Demand (units)"],
        vec![
            vec!["C1", "10"],
            vec!["C2", "20"],
            vec!["C3", "15"],
            vec!["C4", "25"],
        ],
    );

    let distances = RawTable::new(
        vec!["Facility", "C1", "C2", "C3", "C4"],
        vec![
            vec!["F1", "4", "6", "9", "5"],
            vec!["F2", "5", "", "7", "6"],
            vec!["F3", "6", "3", "4", "7"],
        ],
    );

    (facilities, customers, distances)
}

const LAB_DEMANDS: [f64; 4] = [10., 20., 15., 25.];

pub fn min_cost() -> TestScenario {
    TestScenario::new(
        lab_tables(LAB_DEMANDS),
        FormulationOptions::new(Variant::MinCost),
        |report, tables| {
            //F1 + F3 give capacity 90 >= 70 at the lowest fixed cost
            assert_optimal_obj(report, 2385.);
            assert_open(report, &["F1", "F3"]);
            assert_plan_invariants(report, None);
            assert_demand_met(report, tables);
            assert_no_warnings_at_least(report, Severity::Info);
        },
    )
}

pub fn min_cost_two_facilities() -> TestScenario {
    TestScenario::new(
        lab_tables(LAB_DEMANDS),
        FormulationOptions::new(Variant::MinCost).with_max_open_facilities(2),
        |report, tables| {
            assert_optimal_obj(report, 2385.);
            assert_plan_invariants(report, Some(2));
            assert_demand_met(report, tables);
        },
    )
}

pub fn min_cost_one_facility_infeasible() -> TestScenario {
    TestScenario::new(
        lab_tables(LAB_DEMANDS),
        FormulationOptions::new(Variant::MinCost).with_max_open_facilities(1),
        |report, _tables| {
            assert_infeasible(report);
            assert_eq!(
                count_warnings(report, |k| matches!(
                    k,
                    WarningKind::Formulation(BuildWarning::CapacityShortfall { .. })
                )),
                1
            );
        },
    )
}

pub fn max_profit_mandatory() -> TestScenario {
    TestScenario::new(
        lab_tables(LAB_DEMANDS),
        FormulationOptions::new(Variant::MaxProfitMandatory)
            .with_revenue_per_unit(1000.)
            .with_max_open_facilities(3),
        |report, tables| {
            //70 units of revenue, less F1 + F3 fixed costs and 285 transport
            assert_optimal_obj(report, 67615.);
            assert_open(report, &["F1", "F3"]);
            assert_plan_invariants(report, Some(3));
            assert_demand_met(report, tables);
            assert_no_warnings_at_least(report, Severity::Info);

            //single sourcing: each customer appears under exactly one facility
            for customer in tables.customers() {
                let sources = report
                    .open_facilities
                    .iter()
                    .filter(|f| f.shipments.iter().any(|s| s.customer == customer.id))
                    .count();
                assert_eq!(sources, 1, "customer {}", customer.id);
            }
        },
    )
}

pub fn max_profit_mandatory_fractional_demand() -> TestScenario {
    TestScenario::new(
        lab_tables([0.5, 20., 15., 25.]),
        FormulationOptions::new(Variant::MaxProfitMandatory)
            .with_revenue_per_unit(1000.)
            .with_max_open_facilities(3),
        |report, _tables| {
            assert_infeasible(report);
            assert_eq!(
                count_warnings(report, |k| matches!(
                    k,
                    WarningKind::Formulation(BuildWarning::DemandBelowMinimumShipment { customer, .. })
                        if customer == "C1"
                )),
                1
            );
        },
    )
}

pub fn max_profit_optional_unprofitable() -> TestScenario {
    TestScenario::new(
        lab_tables(LAB_DEMANDS),
        FormulationOptions::new(Variant::MaxProfitOptional).with_revenue_per_unit(5.),
        |report, _tables| {
            //no margin covers a fixed cost, so nothing opens
            assert_optimal_obj(report, 0.);
            assert!(report.open_facilities.is_empty());
            assert_no_warnings_at_least(report, Severity::Medium);
            assert_eq!(
                count_warnings(report, |k| matches!(k, WarningKind::NotServed { .. })),
                4
            );
        },
    )
}

pub fn max_profit_optional_one_facility() -> TestScenario {
    TestScenario::new(
        lab_tables(LAB_DEMANDS),
        FormulationOptions::new(Variant::MaxProfitOptional)
            .with_revenue_per_unit(1000.)
            .with_max_open_facilities(1),
        |report, _tables| {
            //without the bound F1 + F3 serve everyone; alone, F2 has the most
            //capacity and fills it by margin, leaving C3 short
            assert_optimal_obj(report, 58485.);
            assert_open(report, &["F2"]);
            assert_plan_invariants(report, Some(1));

            let f2 = report.facility("F2").unwrap();
            assert!((f2.total_shipped - 60.).abs() < EPS);

            let partial: Vec<&WarningKind> = report
                .warnings
                .iter()
                .map(|w| &w.kind)
                .filter(|k| matches!(k, WarningKind::PartiallyServed { .. }))
                .collect();
            assert_eq!(partial.len(), 1);
            assert!(matches!(partial[0],
                WarningKind::PartiallyServed { customer, shipped, .. }
                    if customer == "C3" && (shipped - 5.).abs() < EPS));
        },
    )
}

pub fn max_profit_optional_strict_assign() -> TestScenario {
    TestScenario::new(
        lab_tables([0.5, 20., 15., 25.]),
        FormulationOptions::new(Variant::MaxProfitOptionalStrictAssign)
            .with_revenue_per_unit(1000.),
        |report, _tables| {
            //C1 cannot take a whole unit and is left out, F2 alone covers the rest
            assert_optimal_obj(report, 58465.);
            assert_open(report, &["F2"]);
            assert_plan_invariants(report, None);

            let not_served: Vec<&WarningKind> = report
                .warnings
                .iter()
                .filter(|w| w.severity == Severity::Info)
                .map(|w| &w.kind)
                .collect();
            assert_eq!(
                not_served,
                vec![&WarningKind::NotServed {
                    customer: "C1".to_string(),
                    demand: 0.5
                }]
            );

            assert_eq!(report.facility("F2").unwrap().shipments.len(), 3);
        },
    )
}

pub fn min_cost_with_blank_distance() -> TestScenario {
    let (facilities, customers, distances) = lab_raw_tables_with_blank();
    let tables = normalize(
        &facilities,
        &customers,
        &distances,
        1.,
        &ColumnNames::default(),
    )
    .unwrap();

    TestScenario::new(
        tables,
        FormulationOptions::new(Variant::MinCost),
        |report, tables| {
            assert_optimal_obj(report, 2385.);
            assert_plan_invariants(report, None);
            assert_demand_met(report, tables);

            assert_eq!(
                count_warnings(report, |k| matches!(
                    k,
                    WarningKind::DataSubstitution(d) if d.facility == "F2" && d.customer == "C2"
                )),
                1
            );
        },
    )
}
