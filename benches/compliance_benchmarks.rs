//! Performance benchmarks for the leave compliance engine.
//!
//! Targets:
//! - Leave status over HTTP for one employee: < 200μs mean
//! - Facility summary over 1000 employees: < 50ms mean
//! - Catch-up materialization for 1000 employees: < 100ms mean
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};

use leave_engine::api::{AppState, create_router};
use leave_engine::collaborators::{FixedClock, MemoryDirectory, RecordingNotifier};
use leave_engine::config::ConfigLoader;
use leave_engine::models::{Employee, EmployeeRole};
use leave_engine::service::LeaveService;
use leave_engine::store::MemoryStore;

use axum::{body::Body, http::Request};
use chrono::{Months, NaiveDate};
use tower::ServiceExt;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

/// Employees spread over four facilities with join dates one month apart.
fn create_employees(count: usize) -> Vec<Employee> {
    let first_join = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
    (0..count)
        .map(|i| Employee {
            id: format!("emp_bench_{:04}", i),
            name: format!("Bench Employee {}", i),
            join_date: first_join.checked_add_months(Months::new((i % 160) as u32)),
            facility: format!("facility_{}", i % 4),
            department: None,
            role: EmployeeRole::Staff,
        })
        .collect()
}

/// Creates a service over `employees` with the clock pinned to 2024-05-01.
fn create_service(employees: Vec<Employee>) -> LeaveService {
    let config = ConfigLoader::load("./config/default").expect("Failed to load config");
    LeaveService::new(
        &config,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryDirectory::new(employees)),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FixedClock::on(as_of())),
    )
    .expect("Failed to build service")
}

/// Creates a service whose grants are already materialized.
fn create_accrued_service(count: usize) -> LeaveService {
    let service = create_service(create_employees(count));
    service.materialize_due_grants(None).unwrap();
    service
}

/// Benchmark: Leave status for one employee through the router.
///
/// Target: < 200μs mean
fn bench_leave_status(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = create_router(AppState::new(create_accrued_service(10)));

    c.bench_function("leave_status", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("GET")
                        .uri("/employees/emp_bench_0005/leave-status")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

/// Benchmark: Facility summaries at increasing headcounts.
///
/// Target: < 50ms mean at 1000 employees
fn bench_facility_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("facility_summary");

    for count in [10, 100, 1000].iter() {
        let service = create_accrued_service(*count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("employees", count), count, |b, _| {
            b.iter(|| black_box(service.facility_summary(None, Some(as_of())).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: Catch-up materialization on an empty ledger.
///
/// Target: < 100ms mean at 1000 employees
fn bench_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize");
    // Each iteration rebuilds the service, so keep the sample small
    group.sample_size(10);

    for count in [100, 1000].iter() {
        let employees = create_employees(*count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("employees", count), count, |b, _| {
            b.iter_batched(
                || create_service(employees.clone()),
                |service| black_box(service.materialize_due_grants(None).unwrap()),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_leave_status,
    bench_facility_summary,
    bench_materialize,
);
criterion_main!(benches);
