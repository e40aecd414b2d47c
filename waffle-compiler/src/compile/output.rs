//! Persisting compiler output

use crate::{
    artifacts::{Contract, CompilerOutput},
    error::{CompilerError, Result},
};
use std::path::{Path, PathBuf};

/// The file a contract's artifact is written to: `<target>/<name>.json`
pub fn artifact_path(target: &Path, contract: &str) -> PathBuf {
    target.join(format!("{contract}.json"))
}

/// Writes every contract of `output` as compact json to `<target>/<name>.json`.
///
/// Creates `target` if missing. Contracts with the same name in different files overwrite each
/// other, the last one in file order wins.
pub async fn write_artifacts(output: &CompilerOutput, target: &Path) -> Result<()> {
    tokio::fs::create_dir_all(target).await.map_err(|err| CompilerError::io(err, target))?;
    let mut written = 0usize;
    for (name, contract) in output.contracts_iter() {
        write_artifact(contract, &artifact_path(target, name)).await?;
        written += 1;
    }
    tracing::debug!("wrote {} artifacts to {}", written, target.display());
    Ok(())
}

async fn write_artifact(contract: &Contract, path: &Path) -> Result<()> {
    let content = serde_json::to_vec(contract)?;
    tokio::fs::write(path, content).await.map_err(|err| CompilerError::io(err, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn writes_one_file_per_contract() {
        let output: CompilerOutput = serde_json::from_value(serde_json::json!({
            "contracts": {
                "contracts/A.sol": { "A": { "abi": [], "evm": { "bytecode": { "object": "60" } } } },
                "contracts/B.sol": {
                    "B": { "abi": [] },
                    "Helper": { "abi": [{ "type": "constructor", "inputs": [] }] }
                }
            }
        }))
        .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("build").join("nested");
        write_artifacts(&output, &target).await.unwrap();

        let mut names: Vec<_> = std::fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["A.json", "B.json", "Helper.json"]);

        let a = std::fs::read_to_string(artifact_path(&target, "A")).unwrap();
        assert_eq!(a, r#"{"abi":[],"evm":{"bytecode":{"object":"60"}}}"#);
    }

    #[tokio::test]
    async fn empty_output_creates_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("build");
        write_artifacts(&CompilerOutput::default(), &target).await.unwrap();
        assert!(target.is_dir());
    }
}
