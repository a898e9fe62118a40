use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};
use sheetnorm_map::{MappingEngine, MappingError, TableMapping};
use sheetnorm_model::{JobContext, JobPaths, LoadedManifest, TableInfo};
use sheetnorm_plugins::{
    ColumnRegistry, DetectorArgs, FieldScores, PluginState, ScriptModule, ScriptPackage,
    Signature,
};

fn load(columns: Value, writer: Value) -> LoadedManifest {
    let doc = json!({
        "config_script_api_version": "1",
        "info": {"schema": "sheetnorm.manifest/v1", "title": "Mapping"},
        "engine": {"defaults": {"mapping_score_threshold": 0.5}, "writer": writer},
        "hooks": {},
        "columns": columns,
    });
    LoadedManifest::from_json_str(&doc.to_string(), "inline").expect("manifest")
}

fn table(headers: &[&str], rows: usize) -> TableInfo {
    TableInfo {
        source_file: "input.csv".into(),
        source_sheet: None,
        headers: headers.iter().map(ToString::to_string).collect(),
        row_count: rows,
        header_row_number: 1,
    }
}

fn run(
    manifest: &LoadedManifest,
    package: &ScriptPackage,
    headers: &[&str],
) -> Result<TableMapping, MappingError> {
    let registry = ColumnRegistry::build(manifest, package).expect("registry");
    let job = JobContext::new(
        "job-1",
        Arc::new(manifest.clone()),
        JobPaths::new(Path::new("jobs"), "job-1"),
    );
    let columns: Vec<Vec<Value>> = headers.iter().map(|_| vec![json!("x")]).collect();
    let engine = MappingEngine::new(&registry, &manifest.model);
    engine.map_table(&job, &mut PluginState::new(), &table(headers, 1), &columns)
}

/// Module whose single detector scores by normalized header.
fn scoring_module(name: &str, scores: Vec<(&'static str, FieldScores)>) -> ScriptModule {
    ScriptModule::new(name).detector(
        "detect_by_header",
        Signature::new(["field_name", "header"]),
        move |args: DetectorArgs<'_>| {
            Ok(scores
                .iter()
                .find(|(header, _)| *header == args.header)
                .map(|(_, scores)| scores.clone())
                .unwrap_or_default())
        },
    )
}

#[test]
fn synonym_fallback_and_extra_column() {
    let manifest = load(
        json!({
            "order": ["email"],
            "meta": {"email": {"label": "Email Address", "synonyms": ["E-Mail"]}}
        }),
        json!({}),
    );
    let mapping = run(&manifest, &ScriptPackage::new(), &["E-Mail", "Name"]).expect("map");

    assert_eq!(mapping.mapped.len(), 1);
    let email = &mapping.mapped[0];
    assert_eq!((email.field.as_str(), email.index), ("email", 0));
    assert!(email.via_fallback);
    assert_eq!(email.score, 0.0);

    assert_eq!(mapping.extras.len(), 1);
    assert_eq!(mapping.extras[0].output_header, "raw_name");
    assert_eq!(mapping.extras[0].index, 1);
}

#[test]
fn equal_scores_go_to_the_earlier_field() {
    let mut package = ScriptPackage::new();
    package
        .register(scoring_module(
            "columns/code.py",
            vec![(
                "key",
                FieldScores::from([("code".to_string(), 0.9), ("id".to_string(), 0.9)]),
            )],
        ))
        .expect("register");
    let manifest = load(
        json!({
            "order": ["id", "code"],
            "meta": {"id": {}, "code": {"script": "columns/code.py"}}
        }),
        json!({}),
    );
    let mapping = run(&manifest, &package, &["Key", "Code"]).expect("map");

    let key = mapping.mapping_for("id").expect("id mapped");
    assert_eq!((key.index, key.score), (0, 0.9));
    assert!(!key.via_fallback);
    assert_eq!(key.contributions.len(), 2);

    let code = mapping.mapping_for("code").expect("code mapped");
    assert_eq!(code.index, 1);
    assert!(code.via_fallback);
    assert_eq!(code.score, 0.0);
}

#[test]
fn scores_below_threshold_do_not_map() {
    let mut package = ScriptPackage::new();
    package
        .register(scoring_module(
            "columns/id.py",
            vec![("member", FieldScores::from([("id".to_string(), 0.4)]))],
        ))
        .expect("register");
    let manifest = load(
        json!({"order": ["id"], "meta": {"id": {"script": "columns/id.py", "required": true}}}),
        json!({"append_unmapped_columns": false}),
    );
    let mapping = run(&manifest, &package, &["Member"]).expect("map");
    assert!(mapping.mapped.is_empty());
    assert!(mapping.extras.is_empty());
    assert_eq!(mapping.dropped, vec![0]);
    assert_eq!(mapping.missing_required(&manifest.model), vec!["id"]);
}

#[test]
fn deltas_for_unknown_fields_are_ignored() {
    let mut package = ScriptPackage::new();
    package
        .register(scoring_module(
            "columns/id.py",
            vec![("ident", FieldScores::from([("ghost".to_string(), 5.0)]))],
        ))
        .expect("register");
    let manifest = load(
        json!({"order": ["id"], "meta": {"id": {"script": "columns/id.py"}}}),
        json!({}),
    );
    let mapping = run(&manifest, &package, &["Ident"]).expect("map");
    assert!(mapping.mapped.is_empty());
    assert_eq!(mapping.extras[0].output_header, "raw_ident");
}

#[test]
fn detector_failure_names_field_and_column() {
    let mut package = ScriptPackage::new();
    package
        .register(ScriptModule::new("columns/id.py").detector(
            "detect_fail",
            Signature::kwargs(),
            |args: DetectorArgs<'_>| {
                if args.column_index == 2 {
                    anyhow::bail!("cannot read column");
                }
                Ok(FieldScores::new())
            },
        ))
        .expect("register");
    let manifest = load(
        json!({"order": ["id"], "meta": {"id": {"script": "columns/id.py"}}}),
        json!({}),
    );
    let err = run(&manifest, &package, &["A", "B"]).unwrap_err();
    match err {
        MappingError::Detector {
            field,
            detector,
            column_index,
            ..
        } => {
            assert_eq!(field, "id");
            assert_eq!(detector, "columns/id:detect_fail");
            assert_eq!(column_index, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

const SCORE_STEPS: [f64; 4] = [0.0, 0.5, 0.9, 1.0];

fn matrix_package(matrix: Arc<Vec<Vec<f64>>>, fields: usize) -> ScriptPackage {
    let mut package = ScriptPackage::new();
    package
        .register(ScriptModule::new("columns/matrix.py").detector(
            "detect_matrix",
            Signature::new(["field_name", "column_index"]),
            move |args: DetectorArgs<'_>| {
                let row = &matrix[args.column_index - 1];
                Ok((0..fields)
                    .map(|f| (format!("f{f}"), row[f]))
                    .collect::<FieldScores>())
            },
        ))
        .expect("register");
    package
}

fn matrix_manifest(fields: usize) -> LoadedManifest {
    let order: Vec<String> = (0..fields).map(|f| format!("f{f}")).collect();
    let mut meta = serde_json::Map::new();
    for (i, field) in order.iter().enumerate() {
        let entry = if i == 0 {
            json!({"script": "columns/matrix.py"})
        } else {
            json!({})
        };
        meta.insert(field.clone(), entry);
    }
    load(json!({"order": order, "meta": meta}), json!({}))
}

proptest! {
    #[test]
    fn mapping_is_injective_and_total(
        (fields, matrix) in (1usize..5, 1usize..6).prop_flat_map(|(fields, cols)| {
            (
                Just(fields),
                prop::collection::vec(
                    prop::collection::vec(prop::sample::select(SCORE_STEPS.to_vec()), fields),
                    cols,
                ),
            )
        })
    ) {
        let cols = matrix.len();
        let headers: Vec<String> = (0..cols).map(|c| format!("h{c}")).collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let manifest = matrix_manifest(fields);
        let package = matrix_package(Arc::new(matrix.clone()), fields);

        let first = run(&manifest, &package, &header_refs).expect("map");
        let second = run(&manifest, &package, &header_refs).expect("map again");
        prop_assert_eq!(&first, &second);

        let mut seen = std::collections::BTreeSet::new();
        for mapping in &first.mapped {
            prop_assert!(seen.insert(mapping.field.clone()), "field mapped twice");
            prop_assert!(mapping.score >= 0.5);
        }
        prop_assert_eq!(first.mapped.len() + first.extras.len(), cols);

        // the first column always gets its best field, earliest on ties
        let row = &matrix[0];
        let best = row.iter().copied().fold(0.0_f64, f64::max);
        if best >= 0.5 {
            let expected = row.iter().position(|s| *s == best).expect("best present");
            let first_col = first.mapped.iter().find(|m| m.index == 0).expect("column 0 mapped");
            prop_assert_eq!(&first_col.field, &format!("f{expected}"));
        }
    }
}
