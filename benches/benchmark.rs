// Mapping and document encoding benchmarks
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geomap::{parser_context, IndexSettings, Mapping};
use serde_json::{json, Value};

fn mapping_source(fields: usize) -> Value {
    let mut properties = serde_json::Map::new();
    for i in 0..fields {
        properties.insert(
            format!("tag_{}", i),
            json!({"type": "keyword", "fields": {"raw": {"type": "keyword", "doc_values": false}}}),
        );
        properties.insert(format!("area_{}", i), json!({"type": "geo_shape", "coerce": true}));
    }
    json!({"properties": properties})
}

/// Regular polygon with `sides` vertices around (lon, lat)
fn ring(sides: usize, lon: f64, lat: f64) -> Vec<[f64; 2]> {
    let mut coords: Vec<[f64; 2]> = (0..sides)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / sides as f64;
            [lon + angle.cos(), lat + angle.sin()]
        })
        .collect();
    coords.push(coords[0]);
    coords
}

fn benchmark_parse_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_mapping");
    let context = parser_context(IndexSettings::new()).unwrap();

    for fields in [10, 100, 500].iter() {
        let source = mapping_source(*fields);
        group.bench_with_input(BenchmarkId::new("fields", fields), &source, |b, source| {
            b.iter(|| Mapping::parse(black_box(source), &context).unwrap());
        });
    }
    group.finish();
}

fn benchmark_merge(c: &mut Criterion) {
    let context = parser_context(IndexSettings::new()).unwrap();
    let current = Mapping::parse(&mapping_source(100), &context).unwrap();
    let update = Mapping::parse(&mapping_source(120), &context).unwrap();

    c.bench_function("merge_100_into_120", |b| {
        b.iter(|| current.merge(black_box(&update)).unwrap());
    });
}

fn benchmark_index_polygon(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_polygon");
    let context = parser_context(IndexSettings::new()).unwrap();
    let source = json!({"properties": {"area": {"type": "geo_shape"}}});
    let mapping = Mapping::parse(&source, &context).unwrap();

    for sides in [8, 64, 512].iter() {
        let coords = ring(*sides, 10.0, 45.0);
        let geojson = json!({"area": {"type": "polygon", "coordinates": [coords]}});
        let wkt = json!({
            "area": format!(
                "POLYGON (({}))",
                coords.iter().map(|c| format!("{} {}", c[0], c[1])).collect::<Vec<_>>().join(", ")
            )
        });

        group.bench_with_input(BenchmarkId::new("geojson", sides), &geojson, |b, doc| {
            b.iter(|| mapping.parse_document(black_box(doc)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("wkt", sides), &wkt, |b, doc| {
            b.iter(|| mapping.parse_document(black_box(doc)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_index_dateline(c: &mut Criterion) {
    let context = parser_context(IndexSettings::new()).unwrap();
    let source = json!({"properties": {"area": {"type": "geo_shape"}}});
    let mapping = Mapping::parse(&source, &context).unwrap();
    let doc = json!({
        "area": {
            "type": "polygon",
            "coordinates": [[[170, 10], [170, -10], [-170, -10], [-170, 10], [170, 10]]]
        }
    });

    c.bench_function("index_dateline_polygon", |b| {
        b.iter(|| mapping.parse_document(black_box(&doc)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_parse_mapping,
    benchmark_merge,
    benchmark_index_polygon,
    benchmark_index_dateline
);
criterion_main!(benches);
