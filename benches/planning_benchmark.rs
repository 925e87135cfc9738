use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use highrate_fetch::codec::{build_file_name, gps_week};
use highrate_fetch::models::{DataType, RinexVersion, StationRecord, StationRequest, TimeWindow};
use highrate_fetch::processors::{merged_file_name, FetchPlanner};
use highrate_fetch::readers::StationTable;

const BASE: &str = "https://cddis.nasa.gov";

fn create_station_table(count: usize) -> StationTable {
    let records = (0..count)
        .map(|i| StationRecord {
            site: format!("S{:03}00XXX", i % 1000),
            latitude: -60.0 + (i as f64 * 7.3) % 120.0,
            longitude: -180.0 + (i as f64 * 13.7) % 360.0,
            one_second: i % 3 == 0,
            data_type: DataType::R,
        })
        .collect();
    StationTable::new(records)
}

fn benchmark_full_day_plan(c: &mut Criterion) {
    let window = TimeWindow::new(2025, 100, 0, 24).unwrap();
    let planner = FetchPlanner::new(BASE);

    for version in [RinexVersion::V2, RinexVersion::V3] {
        let request = StationRequest::new("ABMF00GLP", version, DataType::R).unwrap();
        c.bench_function(&format!("plan_full_day_v{}", version), |b| {
            b.iter(|| black_box(planner.plan(&request, &window).len()))
        });
    }
}

fn benchmark_file_names(c: &mut Criterion) {
    c.bench_function("build_file_name_day", |b| {
        b.iter(|| {
            let mut total = 0;
            for hour in 0..24 {
                for minute in [0, 15, 30, 45] {
                    let name = build_file_name(
                        "ABMF00GLP",
                        2025,
                        100,
                        hour,
                        minute,
                        RinexVersion::V3,
                        DataType::R,
                    )
                    .unwrap();
                    total += name.len();
                }
            }
            black_box(total)
        })
    });

    c.bench_function("merged_file_name", |b| {
        b.iter(|| black_box(merged_file_name("ABMF00GLP_R_20251000000_15M_01S_MO.rnx", 24)))
    });

    c.bench_function("gps_week", |b| {
        let date = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        b.iter(|| black_box(gps_week(black_box(date))))
    });
}

fn benchmark_nearest_by_table_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_station_by_size");

    for &size in &[100, 1_000, 10_000] {
        let table = create_station_table(size);
        group.bench_with_input(BenchmarkId::new("stations", size), &table, |b, table| {
            b.iter(|| black_box(table.nearest(4.71, -74.07, 2).unwrap().len()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_full_day_plan,
    benchmark_file_names,
    benchmark_nearest_by_table_size
);
criterion_main!(benches);
