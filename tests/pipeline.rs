#![cfg(unix)]

use httpmock::prelude::*;
use nwp_download::{
    ApiKey, CatalogError, Config, DownloadRequest, Model, Pipeline, PipelineError,
    PipelineOutput,
};
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_FILTER: &str = "#!/bin/sh\ncp \"$4\" \"$2\"\n";
const FAKE_COPY: &str = "#!/bin/sh\nout=\"\"\nfor arg in \"$@\"; do out=\"$arg\"; done\ntmp=\"$out.merging\"\n: > \"$tmp\"\nwhile [ \"$#\" -gt 1 ]; do cat \"$1\" >> \"$tmp\"; shift; done\nmv \"$tmp\" \"$out\"\n";

const ARTIFACT: &str = "harmonie_dini_sf_2024-01-01T00:00:00Z.grib";

fn fake_tools() -> TempDir {
    let bin = TempDir::new().unwrap();
    for (name, script) in [("grib_filter", FAKE_FILTER), ("grib_copy", FAKE_COPY)] {
        let path = bin.path().join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    bin
}

fn config(server: &MockServer, filter_parameters: bool) -> Config {
    let yaml = format!(
        r#"
download:
  stac_url: "{}"
  filter_parameters: {}
  parameters:
    t2m:
      shortName: ["2t"]
      level: ["2"]
      levelType: ["sfc"]
      typeOfLevel: ["heightAboveGround"]
      typeOfStatisticalProcessing: ["0"]
"#,
        server.base_url(),
        filter_parameters
    );
    Config::parse(&yaml, Path::new("test.yaml")).unwrap()
}

/// Publishes `count` files for the 2024-01-01T00:00:00 cycle.
fn publish_cycle(server: &MockServer, count: usize) {
    let features: Vec<_> = (0..count)
        .map(|i| json!({ "asset": { "data": { "href": server.url(format!("/download/file_{i}.grib")) } } }))
        .collect();
    server.mock(|when, then| {
        when.method(GET)
            .path("/harmonie_dini_sf/items")
            .query_param("modelRun", "2024-01-01T00:00:00Z");
        then.status(200)
            .json_body(json!({ "numberReturned": count, "features": features }));
    });
    for i in 0..count {
        server.mock(|when, then| {
            when.method(GET).path(format!("/download/file_{i}.grib"));
            then.status(200).body(format!("<grib {i}>"));
        });
    }
}

fn request(output: &TempDir, bin: &TempDir) -> DownloadRequest {
    DownloadRequest::builder()
        .model(Model::HarmonieDiniSf)
        .cycle("2024-01-01T00:00:00".parse().unwrap())
        .output_dir(output.path())
        .search_path(bin.path().as_os_str().to_os_string())
        .build()
}

fn grib_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "grib"))
        .collect();
    files.sort();
    files
}

fn api_key() -> ApiKey {
    ApiKey::new("test-key").unwrap()
}

#[tokio::test]
async fn downloads_without_filtering() {
    let server = MockServer::start_async().await;
    publish_cycle(&server, 3);
    let output = TempDir::new().unwrap();
    let bin = fake_tools();

    let pipeline =
        Pipeline::from_config(&config(&server, false), &request(&output, &bin), api_key()).unwrap();
    assert!(!pipeline.filters());

    let paths = match pipeline.run().await.unwrap() {
        PipelineOutput::Downloaded(paths) => paths,
        other => panic!("expected downloads only, got {other:?}"),
    };

    assert_eq!(paths.len(), 3);
    assert!(paths.iter().all(|path| path.exists()));
    assert!(!output.path().join(ARTIFACT).exists());
    assert_eq!(grib_files(output.path()), paths);
}

#[tokio::test]
async fn filtering_merges_and_cleans_up() {
    let server = MockServer::start_async().await;
    publish_cycle(&server, 3);
    let output = TempDir::new().unwrap();
    let bin = fake_tools();

    let pipeline =
        Pipeline::from_config(&config(&server, true), &request(&output, &bin), api_key()).unwrap();
    let report = match pipeline.run().await.unwrap() {
        PipelineOutput::Filtered(report) => report,
        other => panic!("expected a filtered artifact, got {other:?}"),
    };

    let artifact = output.path().join(ARTIFACT);
    assert_eq!(report.artifact, artifact);
    assert_eq!(report.merged, 3);
    assert_eq!(report.inputs_removed, 3);
    assert_eq!(
        std::fs::read_to_string(&artifact).unwrap(),
        "<grib 0><grib 1><grib 2>"
    );
    assert_eq!(grib_files(output.path()), vec![artifact]);
}

#[tokio::test]
async fn no_clean_keeps_the_downloads() {
    let server = MockServer::start_async().await;
    publish_cycle(&server, 3);
    let output = TempDir::new().unwrap();
    let bin = fake_tools();
    let mut request = request(&output, &bin);
    request.no_clean = true;

    let pipeline = Pipeline::from_config(&config(&server, true), &request, api_key()).unwrap();
    pipeline.run().await.unwrap();

    assert!(output.path().join(ARTIFACT).exists());
    assert_eq!(grib_files(output.path()).len(), 4);
}

#[tokio::test]
async fn limit_downloads_only_the_first_files() {
    let server = MockServer::start_async().await;
    publish_cycle(&server, 3);
    let output = TempDir::new().unwrap();
    let bin = fake_tools();
    let mut request = request(&output, &bin);
    request.limit = Some(2);

    let pipeline = Pipeline::from_config(&config(&server, false), &request, api_key()).unwrap();
    let output_paths = pipeline.run().await.unwrap();

    assert_eq!(
        output_paths,
        PipelineOutput::Downloaded(vec![
            output.path().join("file_0.grib"),
            output.path().join("file_1.grib"),
        ])
    );
    assert!(!output.path().join("file_2.grib").exists());
}

#[tokio::test]
async fn empty_cycle_downloads_nothing() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/harmonie_dini_sf/items");
        then.status(200)
            .json_body(json!({ "numberReturned": 0, "features": [] }));
    });
    let output = TempDir::new().unwrap();
    let bin = fake_tools();

    let pipeline =
        Pipeline::from_config(&config(&server, true), &request(&output, &bin), api_key()).unwrap();
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Catalog(CatalogError::EmptyCatalog { .. })
    ));
    assert!(grib_files(output.path()).is_empty());
}

#[tokio::test]
async fn every_download_failing_skips_the_filter() {
    let server = MockServer::start_async().await;
    let href = server.url("/download/gone.grib");
    server.mock(|when, then| {
        when.method(GET).path("/harmonie_dini_sf/items");
        then.status(200).json_body(json!({
            "numberReturned": 1,
            "features": [ { "asset": { "data": { "href": href } } } ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/download/gone.grib");
        then.status(500);
    });
    let output = TempDir::new().unwrap();
    let bin = fake_tools();

    let pipeline =
        Pipeline::from_config(&config(&server, true), &request(&output, &bin), api_key()).unwrap();
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::NoFilesDownloaded(1)));
    assert!(!output.path().join(ARTIFACT).exists());
}
