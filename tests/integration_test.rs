// Integration tests for geomap
use geo_types::{point, polygon, Geometry};
use geomap::prelude::*;
use geomap::{
    default_type_parsers, parser_context, GeoShapeFieldMapper, GeoShapeQueryable,
    LegacyGeoShapeFieldMapper, MappedFieldType, Mapper, SpatialStrategy,
};
use geomap_core::document::extent;
use geomap_core::settings::INDEX_MAPPING_IGNORE_MALFORMED;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse(source: Value) -> Result<Mapping> {
    Mapping::parse(&source, &parser_context(IndexSettings::new()).unwrap())
}

fn parse_with(source: Value, settings: IndexSettings) -> Result<Mapping> {
    Mapping::parse(&source, &parser_context(settings).unwrap())
}

#[test]
fn test_type_name_matches_declared_type() {
    let mapping = parse(json!({
        "properties": {
            "tag": {"type": "keyword"},
            "place": {"type": "object", "properties": {"area": {"type": "geo_shape"}}},
            "geo": {"type": "geo_shape"}
        }
    }))
    .unwrap();

    let expected = [
        ("tag", "keyword"),
        ("place", "object"),
        ("place.area", "geo_shape"),
        ("geo", "geo_shape"),
    ];
    for (field, type_name) in expected {
        assert_eq!(mapping.lookup().mapper(field).unwrap().type_name(), type_name);
    }
}

#[test]
fn test_legacy_declaration_keeps_type_name() {
    let settings = IndexSettings::builder().version_created(Version::V_7_0_0).build();
    let mapping = parse_with(
        json!({"properties": {"geo": {"type": "geo_shape", "strategy": "recursive"}}}),
        settings,
    )
    .unwrap();
    let mapper = mapping.lookup().mapper("geo").unwrap();
    assert_eq!(mapper.type_name(), "geo_shape");
    assert!(mapper.as_any().downcast_ref::<LegacyGeoShapeFieldMapper>().is_some());
}

#[test]
fn test_merge_is_non_mutating() {
    let a = parse(json!({
        "properties": {
            "geo": {"type": "geo_shape"},
            "tag": {"type": "keyword", "fields": {"raw": {"type": "keyword"}}}
        }
    }))
    .unwrap();
    let b = parse(json!({
        "properties": {
            "geo": {"type": "geo_shape", "coerce": true, "ignore_z_value": false},
            "tag": {
                "type": "keyword",
                "ignore_above": 32,
                "fields": {"other": {"type": "keyword"}}
            },
            "extra": {"type": "keyword"}
        }
    }))
    .unwrap();

    let (a_before, b_before) = (a.to_json(), b.to_json());
    let merged = a.merge(&b).unwrap();
    assert_eq!(a.to_json(), a_before);
    assert_eq!(b.to_json(), b_before);
    assert_eq!(a.lookup().names(), vec!["geo", "tag", "tag.raw"]);

    let out = merged.to_json();
    assert_eq!(out["properties"]["geo"]["coerce"], json!(true));
    assert_eq!(out["properties"]["geo"]["ignore_z_value"], json!(false));
    assert!(merged.lookup().contains("tag.other"));
    assert!(merged.lookup().contains("tag.raw"));
}

#[test]
fn test_vector_legacy_merge_always_conflicts() {
    let settings = || IndexSettings::builder().version_created(Version::V_6_8_0).build();
    let option_sets = [
        json!({}),
        json!({"orientation": "left"}),
        json!({"coerce": true, "ignore_malformed": true}),
        json!({"ignore_z_value": false}),
    ];

    for options in option_sets {
        let legacy_keys = [
            json!({"strategy": "recursive"}),
            json!({"strategy": "term"}),
            json!({"tree": "quadtree"}),
        ];
        for legacy_key in legacy_keys {
            let mut vector_decl = options.as_object().unwrap().clone();
            vector_decl.insert("type".to_string(), json!("geo_shape"));
            let mut legacy_decl = vector_decl.clone();
            legacy_decl.extend(legacy_key.as_object().unwrap().clone());

            let vector =
                parse_with(json!({"properties": {"geo": vector_decl}}), settings()).unwrap();
            let legacy =
                parse_with(json!({"properties": {"geo": legacy_decl}}), settings()).unwrap();
            let legacy_strategy = legacy
                .lookup()
                .mapper("geo")
                .unwrap()
                .as_any()
                .downcast_ref::<LegacyGeoShapeFieldMapper>()
                .unwrap()
                .strategy();

            for (current, update) in [(&vector, &legacy), (&legacy, &vector)] {
                match current.merge(update) {
                    Err(Error::MergeConflict { field, conflicts }) => {
                        assert_eq!(field, "geo");
                        let message = conflicts.join(" ");
                        assert!(message.contains(SpatialStrategy::Bkd.as_str()));
                        assert!(message.contains(legacy_strategy.as_str()));
                    }
                    other => panic!("expected MergeConflict, got {:?}", other),
                }
            }
        }
    }
}

#[test]
fn test_multi_field_context_flips_only_flag() {
    let settings = IndexSettings::builder().version_created(Version::V_7_5_0).build();
    for ctx in [parser_context(IndexSettings::new()).unwrap(), parser_context(settings).unwrap()] {
        let multi = ctx.create_multi_field_context();
        assert!(multi.is_within_multi_field());
        assert!(!ctx.is_within_multi_field());
        assert_eq!(multi.index_version_created(), ctx.index_version_created());
        assert!(Arc::ptr_eq(multi.type_parsers(), ctx.type_parsers()));
        assert!(Arc::ptr_eq(multi.similarities(), ctx.similarities()));
        assert!(Arc::ptr_eq(multi.index_settings(), ctx.index_settings()));
    }
}

#[test]
fn test_geojson_and_wkt_polygon_encode_equivalently() {
    let mapping = parse(json!({"properties": {"geo": {"type": "geo_shape"}}})).unwrap();

    let geojson = mapping
        .parse_document(&json!({
            "geo": {
                "type": "polygon",
                "coordinates": [[[100, 0], [101, 0], [101, 1], [100, 1], [100, 0]]]
            }
        }))
        .unwrap()
        .shapes("geo");
    let wkt = mapping
        .parse_document(&json!({"geo": "POLYGON ((100 0, 101 0, 101 1, 100 1, 100 0))"}))
        .unwrap()
        .shapes("geo");

    assert!(!geojson.is_empty());
    assert_eq!(geojson.len(), wkt.len());
    assert_eq!(extent(&geojson), extent(&wkt));
    assert_eq!(extent(&geojson), Some([100.0, 0.0, 101.0, 1.0]));
}

#[test]
fn test_malformed_shapes_respect_ignore_malformed() {
    let bow_tie = json!({
        "type": "polygon",
        "coordinates": [[[0, 0], [1, 1], [1, 0], [0, 1], [0, 0]]]
    });
    let degenerate =
        json!({"type": "polygon", "coordinates": [[[0, 0], [1, 1], [2, 2], [0, 0]]]});
    let hole_crossing_shell = json!({
        "type": "polygon",
        "coordinates": [
            [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
            [[5, 5], [15, 5], [15, 6], [5, 6], [5, 5]]
        ]
    });
    let hole_outside_shell = json!(
        "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (20 20, 21 20, 21 21, 20 21, 20 20))"
    );

    let strict = parse(json!({
        "properties": {"geo": {"type": "geo_shape"}, "tag": {"type": "keyword"}}
    }))
    .unwrap();
    let lenient = parse(json!({
        "properties": {
            "geo": {"type": "geo_shape", "ignore_malformed": true},
            "tag": {"type": "keyword"}
        }
    }))
    .unwrap();

    for shape in [bow_tie, degenerate, hole_crossing_shell, hole_outside_shell] {
        let source = json!({"geo": shape, "tag": "kept"});
        assert!(matches!(
            strict.parse_document(&source),
            Err(Error::MalformedGeometry { ref field, .. }) if field == "geo"
        ));

        let doc = lenient.parse_document(&source).unwrap();
        assert!(doc.shapes("geo").is_empty());
        assert_eq!(doc.ignored, vec!["geo"]);
        assert_eq!(doc.fields_named("tag").count(), 2);
    }
}

#[test]
fn test_ignore_malformed_from_index_settings() {
    let settings = IndexSettings::builder().put(INDEX_MAPPING_IGNORE_MALFORMED, true).build();
    let mapping =
        parse_with(json!({"properties": {"geo": {"type": "geo_shape"}}}), settings).unwrap();
    let doc = mapping.parse_document(&json!({"geo": "LINESTRING (0 0)"})).unwrap();
    assert_eq!(doc.ignored, vec!["geo"]);

    // the default is not explicit, so it is not written back out
    assert!(mapping.to_json()["properties"]["geo"].get("ignore_malformed").is_none());
}

#[test]
fn test_unsupported_relations_rejected_per_strategy() {
    let settings = IndexSettings::builder().version_created(Version::V_7_0_0).build();
    let mapping = parse_with(
        json!({
            "properties": {
                "vector": {"type": "geo_shape"},
                "recursive": {"type": "geo_shape", "strategy": "recursive"},
                "term": {"type": "geo_shape", "strategy": "term"}
            }
        }),
        settings,
    )
    .unwrap();
    let shape = Geometry::Polygon(polygon![
        (x: 0.0, y: 0.0),
        (x: 1.0, y: 0.0),
        (x: 1.0, y: 1.0),
        (x: 0.0, y: 1.0),
        (x: 0.0, y: 0.0),
    ]);
    let relations = [
        ShapeRelation::Intersects,
        ShapeRelation::Disjoint,
        ShapeRelation::Within,
        ShapeRelation::Contains,
    ];
    let old_index = QueryShardContext::new(Version::new(7, 4, 0));

    for (field, supported) in [
        ("vector", vec![ShapeRelation::Intersects, ShapeRelation::Disjoint, ShapeRelation::Within]),
        ("recursive", relations.to_vec()),
        ("term", vec![ShapeRelation::Intersects]),
    ] {
        let ft = mapping.lookup().field_type(field).unwrap();
        let queryable = ft.as_geo_shape_queryable().unwrap();
        for relation in relations {
            let result = queryable.geo_shape_query(&shape, field, relation, &old_index);
            if supported.contains(&relation) {
                assert!(result.is_ok(), "{} should support {}", field, relation);
            } else {
                match result {
                    Err(Error::UnsupportedRelation { field: f, relation: r, .. }) => {
                        assert_eq!(f, field);
                        assert_eq!(r, relation.to_string());
                    }
                    other => panic!(
                        "expected UnsupportedRelation for {} {}, got {:?}",
                        field, relation, other
                    ),
                }
            }
        }
    }

    // contains becomes available for indices created on or after 7.5.0
    let ft = mapping.lookup().field_type("vector").unwrap();
    let query = ft
        .as_geo_shape_queryable()
        .unwrap()
        .geo_shape_query(
            &shape,
            "vector",
            ShapeRelation::Contains,
            &QueryShardContext::new(Version::V_7_5_0),
        )
        .unwrap();
    assert!(query.matches(&Geometry::Polygon(polygon![
        (x: -1.0, y: -1.0),
        (x: 2.0, y: -1.0),
        (x: 2.0, y: 2.0),
        (x: -1.0, y: 2.0),
        (x: -1.0, y: -1.0),
    ])));
    assert!(!query.matches(&Geometry::Point(point!(x: 0.5, y: 0.5))));
}

#[test]
fn test_geo_field_has_no_doc_values_and_refuses_sort() {
    let mapping = parse(json!({"properties": {"geo": {"type": "geo_shape"}}})).unwrap();
    let ft = mapping.lookup().field_type("geo").unwrap();
    assert!(!ft.has_doc_values());
    assert_eq!(ft.type_name(), "geo_shape");

    match mapping.sort_field("geo") {
        Err(Error::UnsupportedOperation { field, .. }) => assert_eq!(field, "geo"),
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
}

#[test]
fn test_copy_to_targets_must_exist() {
    match parse(json!({"properties": {"geo": {"type": "geo_shape", "copy_to": "shapes"}}})) {
        Err(Error::MappingValidation { field, referenced, .. }) => {
            assert_eq!(field, "geo");
            assert_eq!(referenced, "shapes");
        }
        other => panic!("expected MappingValidation, got {:?}", other),
    }

    let mapping = parse(json!({
        "properties": {
            "geo": {"type": "geo_shape", "copy_to": "shapes"},
            "shapes": {"type": "geo_shape"}
        }
    }))
    .unwrap();
    let doc = mapping.parse_document(&json!({"geo": "POINT (5 5)"})).unwrap();
    assert_eq!(doc.shapes("geo"), doc.shapes("shapes"));
    assert_eq!(doc.shapes("shapes"), vec![ShapePrimitive::Point { at: [5.0, 5.0] }]);
}

#[test]
fn test_merge_applies_explicit_options_and_rejects_orientation_change() {
    let current = parse(json!({
        "properties": {"geo": {"type": "geo_shape", "orientation": "ccw"}}
    }))
    .unwrap();

    let relaxed = parse(json!({
        "properties": {"geo": {"type": "geo_shape", "coerce": true, "ignore_malformed": true}}
    }))
    .unwrap();
    let merged = current.merge(&relaxed).unwrap();
    let mapper = merged
        .lookup()
        .mapper("geo")
        .unwrap()
        .as_any()
        .downcast_ref::<GeoShapeFieldMapper>()
        .unwrap();
    assert!(mapper.options().coerce.value());
    assert!(mapper.options().ignore_malformed.value());

    // coerce now closes rings the original mapping rejected
    let open_ring =
        json!({"geo": {"type": "polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]]}});
    assert!(current.parse_document(&open_ring).is_err());
    assert_eq!(merged.parse_document(&open_ring).unwrap().shapes("geo").len(), 2);

    let flipped = parse(json!({
        "properties": {"geo": {"type": "geo_shape", "orientation": "cw"}}
    }))
    .unwrap();
    assert!(matches!(current.merge(&flipped), Err(Error::MergeConflict { .. })));
}

#[test]
fn test_unknown_declarations_name_the_field() {
    assert!(matches!(
        parse(json!({"properties": {"geo": {"type": "geo_point"}}})),
        Err(Error::UnknownType { ref field, .. }) if field == "geo"
    ));
    assert!(matches!(
        parse(json!({"properties": {"tag": {"type": "keyword", "similarity": "dfr"}}})),
        Err(Error::UnknownSimilarity { ref field, .. }) if field == "tag"
    ));
    assert!(matches!(
        parse(json!({"properties": {"geo": {"type": "geo_shape", "analyzer": "x"}}})),
        Err(Error::UnknownParameter { ref field, ref key }) if field == "geo" && key == "analyzer"
    ));
}

#[test]
fn test_nested_multi_fields_rejected() {
    let result = parse(json!({
        "properties": {
            "geo": {
                "type": "geo_shape",
                "fields": {"alt": {"type": "geo_shape", "fields": {"deeper": {"type": "keyword"}}}}
            }
        }
    }));
    assert!(matches!(result, Err(Error::InvalidArgument(ref msg)) if msg.contains("alt")));
}

#[test]
fn test_default_registry_contents() {
    assert_eq!(default_type_parsers().type_names(), vec!["geo_shape", "keyword", "object"]);
}
