use std::io::Write;
use tempfile::NamedTempFile;
use termflow::{
    AnalysisConfig, ConfigError, Dataflow, DumpError, TerminalRef, fsm_candidates, register_loops,
};

const FSM_DUMP: &str = r#"{
    "top_module": "TOP",
    "terms": {
        "TOP.clk":   { "width": 1, "kind": "wire" },
        "TOP.start": { "width": 1, "kind": "wire" },
        "TOP.IDLE":  { "width": 2, "kind": "parameter" },
        "TOP.state": { "width": 2, "kind": "reg" },
        "TOP.busy":  { "width": 1, "kind": "wire" }
    },
    "binds": {
        "TOP.state": [
            { "tree": { "kind": "mux",
                        "cond": { "kind": "terminal", "name": "TOP.start", "width": 1 },
                        "then_expr": { "kind": "binary", "op": "add",
                                       "lhs": { "kind": "terminal", "name": "TOP.state", "width": 2 },
                                       "rhs": { "kind": "constant", "value": "1", "width": 2 } },
                        "else_expr": { "kind": "terminal", "name": "TOP.IDLE", "width": 2 } } }
        ],
        "TOP.busy": [
            { "tree": { "kind": "binary", "op": "ne",
                        "lhs": { "kind": "terminal", "name": "TOP.state", "width": 2 },
                        "rhs": { "kind": "terminal", "name": "TOP.IDLE", "width": 2 } } }
        ]
    },
    "resolved_binds": {
        "TOP.state": [
            { "tree": { "kind": "mux",
                        "cond": { "kind": "terminal", "name": "TOP.start", "width": 1 },
                        "then_expr": { "kind": "binary", "op": "add",
                                       "lhs": { "kind": "terminal", "name": "TOP.state", "width": 2 },
                                       "rhs": { "kind": "constant", "value": "1", "width": 2 } },
                        "else_expr": { "kind": "constant", "value": "0", "width": 2 } } }
        ],
        "TOP.busy": [
            { "tree": { "kind": "unary", "op": "or",
                        "operand": { "kind": "terminal", "name": "TOP.state", "width": 2 } } }
        ]
    }
}"#;

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn load_dump_and_analyze_both_views() {
    let file = temp_file(FSM_DUMP);
    let dataflow = Dataflow::load(file.path()).unwrap();
    let config = AnalysisConfig::default();

    let raw = dataflow.analyze_raw(&config);
    assert!(raw.is_complete());
    assert!(
        raw.maps
            .drivers("TOP.state", 0)
            .unwrap()
            .contains(&TerminalRef::new("TOP.IDLE", 0))
    );

    let resolved = dataflow.analyze_resolved(&config);
    assert!(
        !resolved
            .maps
            .signal_drivers("TOP.state")
            .iter()
            .any(|t| t.name == "TOP.IDLE")
    );
    assert_eq!(
        resolved.maps.readers("TOP.state").map(|r| r.len()),
        Some(2)
    );
}

#[test]
fn loops_found_from_loaded_dump() {
    let file = temp_file(FSM_DUMP);
    let dataflow = Dataflow::load(file.path()).unwrap();
    let config = AnalysisConfig::default();
    let report = dataflow.analyze_resolved(&config);

    let loops = register_loops(&dataflow.resolved, &report.maps);
    assert_eq!(loops.len(), 1);
    assert!(loops[0].self_loop);
    assert_eq!(fsm_candidates(&loops, &config).len(), 1);
}

#[test]
fn config_file_scopes_the_analysis() {
    let dump = temp_file(FSM_DUMP);
    let config = temp_file(
        r#"
        top_module = "TOP.sub"
        max_depth = 32
        search_targets = ["busy"]
        "#,
    );
    let config = AnalysisConfig::load(config.path()).unwrap();
    assert_eq!(config.max_depth, 32);

    let dataflow = Dataflow::load(dump.path()).unwrap();
    let report = dataflow.analyze_raw(&config);
    assert!(report.maps.is_empty());
}

#[test]
fn missing_files_are_reported_with_their_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = Dataflow::load(&path).unwrap_err();
    assert!(matches!(err, DumpError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));

    let err = AnalysisConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_json_is_rejected() {
    let file = temp_file("{ \"terms\": ");
    let err = Dataflow::load(file.path()).unwrap_err();
    assert!(matches!(err, DumpError::Json(_)));
}
