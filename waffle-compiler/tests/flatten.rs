//! flattener tests

use pretty_assertions::assert_eq;
use std::{fs, path::Path};
use waffle_compiler::{error::CompilerError, flatten_and_save, Config, Flattener};

fn config(out: &Path) -> Config {
    Config::default()
        .sources("test-data/flattener/testSource")
        .npm("test-data/node_modules")
        .flatten_output(out)
}

async fn flat_child(out: &Path) -> String {
    flatten_and_save(&config(out)).await.unwrap();
    fs::read_to_string(out.join("child.sol")).unwrap()
}

#[tokio::test]
async fn properly_flattens_source() {
    let tmp = tempfile::tempdir().unwrap();
    let flat = flat_child(tmp.path()).await;
    let expected = fs::read_to_string("test-data/flattener/expectedFlattenChild.sol").unwrap();
    assert_eq!(flat, expected);
}

#[tokio::test]
async fn writes_every_source_file() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("flatten");
    let mut written = flatten_and_save(&config(&out)).await.unwrap();
    written.sort();
    assert_eq!(written, vec![out.join("child.sol"), out.join("parent.sol")]);
    assert!(fs::read_to_string(out.join("parent.sol"))
        .unwrap()
        .starts_with("// Root file: test-data/flattener/testSource/parent.sol\n\npragma solidity ^0.5.0;"));
}

#[tokio::test]
async fn comments_dependency_pragmas() {
    let tmp = tempfile::tempdir().unwrap();
    let flat = flat_child(tmp.path()).await;
    assert!(flat.contains("// pragma solidity ^0.5.0;"));
    assert!(flat.contains("// pragma solidity ^0.5.2;"));
}

#[tokio::test]
async fn leaves_source_pragma_uncommented() {
    let tmp = tempfile::tempdir().unwrap();
    let flat = flat_child(tmp.path()).await;
    assert!(flat.contains("\npragma solidity >=0.4.24 <0.6.0;"));
}

#[tokio::test]
async fn leaves_other_pragmas_uncommented() {
    let tmp = tempfile::tempdir().unwrap();
    let flat = flat_child(tmp.path()).await;
    assert!(flat.contains("\npragma experimental ABIEncoderV2;"));
}

#[test]
fn flattening_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let flattener = Flattener::from_config(&config(tmp.path()));
    let entry = "test-data/flattener/testSource/child.sol";
    let first = flattener.flatten(entry).unwrap();
    assert_eq!(flattener.flatten(entry).unwrap(), first);
    assert_eq!(first.matches("library SafeMath").count(), 1);
}

#[tokio::test]
async fn missing_sources_dir_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path()).sources("test-data/flattener/missing");
    assert!(matches!(flatten_and_save(&config).await.unwrap_err(), CompilerError::NotFound(_)));
}
