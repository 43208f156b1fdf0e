use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::qb::{self, Condition, SelectQb, SqlQb, eq, in_list, indirect, or};
use sqlweave::Placeholder;

/// SELECT col0, col1, ... FROM t WHERE col0 = ? AND col1 = ? ...
fn build_select(n: usize) -> SelectQb {
    let columns: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let conditions: Vec<Condition> = (0..n).map(|i| eq(format!("col{i}"), i as i64)).collect();
    qb::select(columns).from("t").where_all(conditions)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/select_build");

    for n in [1, 5, 10, 50, 100] {
        let stmt = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &stmt, |b, stmt| {
            b.iter(|| black_box(stmt.build()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let stmt = qb::select_from("t").and_where(in_list("id", values.iter().copied()));
                black_box(stmt.build())
            });
        });
    }

    group.finish();
}

fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/nested");

    for depth in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut stmt = qb::select(["id"]).from("t0").eq("k", 0_i64);
                for level in 1..=depth {
                    stmt = qb::select(["a.id"])
                        .from(format!("t{level} a"))
                        .inner_join_rs(stmt, "b", [eq("a.id", indirect("b.id"))])
                        .and_where(or([eq("a.x", level as i64), eq("a.y", level as i64)]));
                }
                black_box(stmt.build())
            });
        });
    }

    group.finish();
}

fn bench_rebind(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/rebind");

    for n in [10, 100] {
        let sql = build_select(n).to_sql().unwrap_or_default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(Placeholder::Dollar.rebind(sql)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_in_list, bench_nested, bench_rebind);
criterion_main!(benches);
