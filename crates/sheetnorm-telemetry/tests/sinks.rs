use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use sheetnorm_model::{JobContext, JobPaths, LoadedManifest, Severity};
use sheetnorm_telemetry::{
    ArtifactDocument, ArtifactStatus, DispatchEventSink, EventSink, EventSinkFactory,
    FileSinkProvider, NdjsonEventSink, SinkCatalog, TelemetryBindings, TelemetryConfig,
    TelemetryError, payload,
};

fn job(root: &Path) -> JobContext {
    let manifest = json!({
        "config_script_api_version": "1",
        "info": {"schema": "sheetnorm.manifest/v1", "title": "Telemetry"},
        "engine": {"defaults": {}, "writer": {}},
        "hooks": {},
        "columns": {"order": ["email"], "meta": {"email": {}}}
    });
    let manifest = LoadedManifest::from_json_str(&manifest.to_string(), "inline").expect("manifest");
    let paths = JobPaths::new(root, "job-1");
    paths.ensure().expect("job dirs");
    JobContext::new("job-1", Arc::new(manifest), paths)
}

fn read_artifact(path: &Path) -> ArtifactDocument {
    let text = fs::read_to_string(path).expect("read artifact");
    serde_json::from_str(&text).expect("parse artifact")
}

fn read_events(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("read events")
        .lines()
        .map(|line| serde_json::from_str(line).expect("event line"))
        .collect()
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.seen
            .lock()
            .expect("lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn factory(&self) -> EventSinkFactory {
        let recorder = self.clone();
        Arc::new(
            move |_job: &JobContext,
                  _config: &TelemetryConfig|
                  -> sheetnorm_telemetry::Result<Box<dyn EventSink>> {
                Ok(Box::new(recorder.clone()))
            },
        )
    }
}

impl EventSink for Recorder {
    fn log(
        &mut self,
        event: &str,
        _level: Severity,
        _job: &JobContext,
        payload: &Map<String, Value>,
    ) -> sheetnorm_telemetry::Result<()> {
        self.seen
            .lock()
            .expect("lock")
            .push((event.to_string(), payload.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

struct Broken;

impl EventSink for Broken {
    fn log(
        &mut self,
        _event: &str,
        _level: Severity,
        _job: &JobContext,
        _payload: &Map<String, Value>,
    ) -> sheetnorm_telemetry::Result<()> {
        Err(TelemetryError::NotStarted)
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[test]
fn artifact_persists_on_start_and_only_changes_on_flush() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let config = TelemetryConfig::default();
    let mut telemetry =
        TelemetryBindings::bind(&job, &config, &FileSinkProvider, &SinkCatalog::default())
            .expect("bind");

    telemetry.start(&job).expect("start");
    let initial = read_artifact(&job.paths.artifact_path);
    assert_eq!(initial.job.status, ArtifactStatus::Running);
    assert_eq!(initial.config.title.as_deref(), Some("Telemetry"));
    assert_eq!(initial.config.manifest_sha256, job.manifest.sha256);

    telemetry.note(Severity::Warning, "required field 'email' was not mapped", Map::new());
    telemetry.mark_failure("boom");
    let on_disk = read_artifact(&job.paths.artifact_path);
    assert!(on_disk.notes.is_empty());
    assert_eq!(on_disk.job.status, ArtifactStatus::Running);

    telemetry.flush().expect("flush");
    let flushed = read_artifact(&job.paths.artifact_path);
    assert_eq!(flushed.job.status, ArtifactStatus::Failed);
    assert_eq!(flushed.job.error.as_deref(), Some("boom"));
    assert_eq!(flushed.notes.len(), 1);
    assert!(flushed.job.completed_at.is_some());
}

#[test]
fn ndjson_sink_appends_one_envelope_per_event() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let mut sink =
        NdjsonEventSink::new(job.paths.events_path.clone()).with_run_id(Some("run-7".into()));
    sink.log("job.started", Severity::Info, &job, &Map::new())
        .expect("first");
    sink.log(
        "pipeline.transition",
        Severity::Info,
        &job,
        &payload(json!({"phase": "extracting"})),
    )
    .expect("second");

    let events = read_events(&job.paths.events_path);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["schema"], "sheetnorm.event/v1");
    assert_eq!(events[0]["job_id"], "job-1");
    assert_eq!(events[0]["run_id"], "run-7");
    assert_eq!(events[1]["event"], "pipeline.transition");
    assert_eq!(events[1]["payload"]["phase"], "extracting");
}

#[test]
fn dispatch_keeps_calling_sinks_after_a_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let recorder = Recorder::default();
    let sinks: Vec<Box<dyn EventSink>> = vec![Box::new(Broken), Box::new(recorder.clone())];
    let mut dispatch = DispatchEventSink::new(sinks);

    let err = dispatch
        .log("job.started", Severity::Info, &job, &Map::new())
        .unwrap_err();
    assert!(matches!(
        err,
        TelemetryError::Dispatch {
            failed: 1,
            total: 2,
            ..
        }
    ));
    assert_eq!(recorder.events(), vec!["job.started"]);
}

#[test]
fn bindings_gate_by_severity_and_merge_correlation_id() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let recorder = Recorder::default();
    let config = TelemetryConfig::default()
        .with_correlation_id(Some("corr-1".into()))
        .with_note_level(Severity::Warning)
        .with_event_level(Severity::Info)
        .with_sink_factory(recorder.factory());
    let mut telemetry =
        TelemetryBindings::bind(&job, &config, &FileSinkProvider, &SinkCatalog::default())
            .expect("bind");
    telemetry.start(&job).expect("start");

    telemetry.note(Severity::Info, "quiet", Map::new());
    telemetry.note(Severity::Error, "loud", Map::new());
    telemetry.emit(&job, Severity::Debug, "noise", Map::new());
    telemetry.emit(&job, Severity::Warning, "validation.issue", Map::new());
    telemetry.flush().expect("flush");

    let artifact = read_artifact(&job.paths.artifact_path);
    assert_eq!(artifact.notes.len(), 1);
    assert_eq!(artifact.notes[0].message, "loud");
    assert_eq!(artifact.notes[0].details["correlation_id"], "corr-1");

    assert_eq!(recorder.events(), vec!["validation.issue"]);
    let events = read_events(&job.paths.events_path);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["run_id"], "corr-1");
    assert_eq!(events[0]["payload"]["correlation_id"], "corr-1");
}

#[test]
fn unknown_sink_spec_fails_binding() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let config = TelemetryConfig::default().with_sink_spec("acme.audit:sink");
    let result = TelemetryBindings::bind(&job, &config, &FileSinkProvider, &SinkCatalog::default());
    assert!(matches!(result, Err(TelemetryError::UnknownSink { .. })));
}

#[test]
fn catalog_registered_spec_receives_events() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let recorder = Recorder::default();
    let mut catalog = SinkCatalog::default();
    catalog
        .register("acme.audit:sink", recorder.factory())
        .expect("register");
    let config = TelemetryConfig::default().with_sink_spec("acme.audit:sink");
    let mut telemetry =
        TelemetryBindings::bind(&job, &config, &FileSinkProvider, &catalog).expect("bind");
    telemetry.emit(&job, Severity::Info, "job.started", Map::new());
    assert_eq!(recorder.events(), vec!["job.started"]);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn gated_entries_are_traced_at_debug() {
    let dir = tempfile::tempdir().expect("temp dir");
    let job = job(dir.path());
    let config = TelemetryConfig::default()
        .with_correlation_id(Some("corr-9".into()))
        .with_note_level(Severity::Error)
        .with_event_level(Severity::Error);
    let mut telemetry =
        TelemetryBindings::bind(&job, &config, &FileSinkProvider, &SinkCatalog::default())
            .expect("bind");

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        telemetry.note(Severity::Info, "quiet note", payload(json!({"field": "email"})));
        telemetry.emit(&job, Severity::Warning, "table.extracted", Map::new());
    });

    let text = String::from_utf8(logs.0.lock().expect("lock").clone()).expect("utf8");
    assert!(text.contains("note below threshold"));
    assert!(text.contains("event below threshold"));
    assert!(text.contains("corr-9"));
    assert!(text.contains("table.extracted"));
}
