use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use schema_atlas::graph::{extract, to_dot, DegreeVariant, DotConfig, NeighborhoodOptions, RelationshipGraph};
use schema_atlas::schema::parse_schema;
use std::hint::black_box;

/// Star schema: one hub table referenced by `spokes` satellite tables, each
/// satellite referenced by one leaf (so two-degree extraction has work to do)
fn generate_star_schema(spokes: usize) -> String {
    let mut sql = String::from("CREATE TABLE hub (id INT PRIMARY KEY, name VARCHAR(100));\n");

    for s in 0..spokes {
        sql.push_str(&format!(
            "CREATE TABLE spoke_{s} (id INT PRIMARY KEY, hub_id INT, payload VARCHAR(255),\
             FOREIGN KEY (hub_id) REFERENCES hub(id));\n"
        ));
        sql.push_str(&format!(
            "CREATE TABLE leaf_{s} (id INT PRIMARY KEY, spoke_id INT,\
             FOREIGN KEY (spoke_id) REFERENCES spoke_{s}(id));\n"
        ));
    }

    sql
}

fn generate_chain_schema(length: usize) -> String {
    let mut sql = String::from("CREATE TABLE link_0 (id INT PRIMARY KEY);\n");
    for i in 1..length {
        sql.push_str(&format!(
            "CREATE TABLE link_{i} (id INT PRIMARY KEY, prev_id INT,\
             FOREIGN KEY (prev_id) REFERENCES link_{prev}(id));\n",
            prev = i - 1
        ));
    }
    sql
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighborhood_extract");

    for spokes in [10, 50, 200] {
        let (schema, _) = parse_schema(&generate_star_schema(spokes));
        let graph = RelationshipGraph::from_schema(schema);
        let hub = graph.schema().get_table_id("hub").unwrap();
        let options = NeighborhoodOptions::default();

        group.bench_with_input(BenchmarkId::new("two_degrees_star", spokes), &spokes, |b, _| {
            b.iter(|| {
                black_box(extract(
                    &graph,
                    hub,
                    DegreeVariant::TwoDegrees,
                    &options,
                ))
            })
        });
    }

    let (schema, _) = parse_schema(&generate_chain_schema(500));
    let graph = RelationshipGraph::from_schema(schema);
    let mid = graph.schema().get_table_id("link_250").unwrap();
    let options = NeighborhoodOptions::default();

    group.bench_function("two_degrees_chain_500", |b| {
        b.iter(|| {
            black_box(extract(
                &graph,
                mid,
                DegreeVariant::TwoDegrees,
                &options,
            ))
        })
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let (schema, _) = parse_schema(&generate_star_schema(100));
    let graph = RelationshipGraph::from_schema(schema);
    let hub = graph.schema().get_table_id("hub").unwrap();
    let nb = extract(
        &graph,
        hub,
        DegreeVariant::TwoDegrees,
        &NeighborhoodOptions::default(),
    );
    let config = DotConfig::default();

    c.bench_function("to_dot_star_100", |b| {
        b.iter(|| black_box(to_dot(&graph, &nb, &config)))
    });
}

criterion_group!(benches, bench_extraction, bench_serialization);
criterion_main!(benches);
