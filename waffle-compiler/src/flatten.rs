//! Inlining a file's transitive imports into one compilable file.
//!
//! Files are emitted dependencies first, each exactly once, under a header naming its path:
//!
//! ```text
//! // Dependency file: node_modules/openzeppelin-solidity/contracts/math/SafeMath.sol
//!
//! // pragma solidity ^0.5.2;
//! library SafeMath { ... }
//!
//! // Root file: contracts/Token.sol
//!
//! pragma solidity ^0.5.2;
//! // import "openzeppelin-solidity/contracts/math/SafeMath.sol";
//! contract Token { ... }
//! ```
//!
//! Import statements are commented out everywhere. Compiler version pragmas and license
//! identifiers are neutralized in dependencies only, so the root file decides both.

use crate::{
    config::Config,
    error::{CompilerError, Result},
    resolver::{ImportResolution, ImportResolver},
    utils::{self, RE_SOL_IMPORT, RE_SOL_SPDX},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

static RE_SOL_VERSION_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*pragma\s+solidity\b").unwrap());

const DEPENDENCY_HEADER: &str = "// Dependency file: ";
const ROOT_HEADER: &str = "// Root file: ";

const SPDX_TAG: &str = "SPDX-License-Identifier:";
const LICENSE_TAG: &str = "License-Identifier:";

/// Flattens files, looking up package imports with an [`ImportResolver`]
#[derive(Debug, Clone)]
pub struct Flattener {
    resolver: ImportResolver,
}

/// A file reached while walking the import graph
#[derive(Debug)]
struct Visited {
    path: PathBuf,
    content: String,
}

#[derive(Debug, Default)]
struct Walk {
    seen: HashSet<PathBuf>,
    ordered: Vec<Visited>,
}

impl Flattener {
    pub fn new(resolver: ImportResolver) -> Self {
        Self { resolver }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ImportResolver::from_config(config))
    }

    /// Returns `entry` with all of its transitive imports inlined.
    ///
    /// Fails with [`CompilerError::UnresolvedImport`] if an import can not be found.
    pub fn flatten(&self, entry: impl AsRef<Path>) -> Result<String> {
        let entry = utils::normalize_path(entry.as_ref());
        tracing::trace!("flattening {}", entry.display());
        let mut walk = Walk::default();
        self.visit(entry.clone(), &mut walk)?;

        let last = walk.ordered.len().saturating_sub(1);
        let parts: Vec<_> = walk
            .ordered
            .iter()
            .enumerate()
            .map(|(idx, file)| {
                let (header, body) = if idx == last {
                    (ROOT_HEADER, comment_directives(&file.content, false))
                } else {
                    (DEPENDENCY_HEADER, comment_directives(&file.content, true))
                };
                format!("{header}{}\n\n{}", utils::slash_string(&file.path), body.trim_end())
            })
            .collect();
        tracing::trace!("flattened {} files into {}", parts.len(), entry.display());
        Ok(format!("{}\n", parts.join("\n\n")))
    }

    /// Depth first, a file is marked on entry and emitted on exit so imports precede importers
    /// and cycles terminate
    fn visit(&self, file: PathBuf, walk: &mut Walk) -> Result<()> {
        let identity = utils::canonicalize(&file).unwrap_or_else(|_| file.clone());
        if !walk.seen.insert(identity) {
            return Ok(())
        }
        let content = fs::read_to_string(&file).map_err(|err| CompilerError::io(err, &file))?;
        let code = utils::blank_comments(&content);
        for import in utils::find_import_paths(&code) {
            let dependency = self.locate(import, &file)?;
            self.visit(dependency, walk)?;
        }
        walk.ordered.push(Visited { path: file, content });
        Ok(())
    }

    fn locate(&self, import: &str, importer: &Path) -> Result<PathBuf> {
        let located = if import.starts_with("./") || import.starts_with("../") {
            let dir = importer.parent().unwrap_or_else(|| Path::new(""));
            Some(dir.join(import)).filter(|p| p.is_file())
        } else {
            self.resolver.locate(import)
        };
        match located {
            Some(path) => Ok(utils::normalize_path(&path)),
            None => Err(CompilerError::UnresolvedImport {
                import: import.to_string(),
                file: importer.to_path_buf(),
                reason: ImportResolution::not_found(import).error().unwrap_or_default().to_string(),
            }),
        }
    }
}

/// Comments out every line of every import statement. In dependencies compiler version pragmas
/// are commented out as well and license identifiers are defused, `solc` rejects a second one even
/// inside a comment.
fn comment_directives(content: &str, dependency: bool) -> String {
    let code = utils::blank_comments(content);
    let mut commented = HashSet::new();
    for m in RE_SOL_IMPORT.find_iter(&code) {
        let first = code[..m.start()].matches('\n').count();
        let last = first + m.as_str().matches('\n').count();
        commented.extend(first..=last);
    }
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| {
            if dependency && RE_SOL_SPDX.is_match(line) {
                line.replacen(SPDX_TAG, LICENSE_TAG, 1)
            } else if dependency && RE_SOL_VERSION_DIRECTIVE.is_match(line) {
                format!("// {line}")
            } else if commented.contains(&idx) && !line.trim_start().starts_with("//") {
                format!("// {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flattens every source file of the project and writes each result to
/// `<flattenOutputDirectory>/<file name>`.
///
/// Returns the written files.
pub async fn flatten_and_save(config: &Config) -> Result<Vec<PathBuf>> {
    let flattener = Flattener::from_config(config);
    let files = utils::source_files(&config.sources_path, &config.source_extension)?;
    let out_dir = &config.flatten_output_directory;
    tokio::fs::create_dir_all(out_dir).await.map_err(|err| CompilerError::io(err, out_dir))?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let flattened = flattener.flatten(&file)?;
        let name = file.file_name().ok_or_else(|| {
            CompilerError::msg(format!("\"{}\" has no file name", file.display()))
        })?;
        let target = out_dir.join(name);
        tokio::fs::write(&target, flattened).await.map_err(|err| CompilerError::io(err, &target))?;
        written.push(target);
    }
    tracing::debug!("flattened {} files into {}", written.len(), out_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::{create_dir_all, write};

    fn flattener(root: &Path) -> Flattener {
        Flattener::new(ImportResolver::new(root.join("node_modules")).with_root(root))
    }

    #[test]
    fn comments_dependency_directives_only() {
        let source = "// SPDX-License-Identifier: MIT\npragma solidity ^0.5.2;\npragma experimental ABIEncoderV2;\nimport \"./A.sol\";\ncontract B {}";
        assert_eq!(
            comment_directives(source, true),
            "// License-Identifier: MIT\n// pragma solidity ^0.5.2;\npragma experimental ABIEncoderV2;\n// import \"./A.sol\";\ncontract B {}"
        );
        assert_eq!(
            comment_directives(source, false),
            "// SPDX-License-Identifier: MIT\npragma solidity ^0.5.2;\npragma experimental ABIEncoderV2;\n// import \"./A.sol\";\ncontract B {}"
        );
    }

    #[test]
    fn comments_multi_line_imports() {
        let source = "import {\n    A,\n    B\n} from \"./A.sol\";\ncontract C {}";
        assert_eq!(
            comment_directives(source, false),
            "// import {\n//     A,\n//     B\n// } from \"./A.sol\";\ncontract C {}"
        );
    }

    #[test]
    fn emits_dependencies_first_and_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        create_dir_all(root.join("contracts")).unwrap();
        create_dir_all(root.join("node_modules/pkg")).unwrap();
        write(root.join("node_modules/pkg/Base.sol"), "pragma solidity ^0.5.0;\ncontract Base {}\n").unwrap();
        write(
            root.join("contracts/Mid.sol"),
            "pragma solidity ^0.5.2;\nimport \"pkg/Base.sol\";\ncontract Mid is Base {}\n",
        )
        .unwrap();
        write(
            root.join("contracts/Top.sol"),
            "pragma solidity ^0.5.2;\nimport \"./Mid.sol\";\nimport \"pkg/Base.sol\";\ncontract Top is Mid {}\n",
        )
        .unwrap();

        let flattener = flattener(root);
        let top = root.join("contracts/Top.sol");
        let flat = flattener.flatten(&top).unwrap();

        let base = utils::slash_string(&root.join("node_modules/pkg/Base.sol"));
        let mid = utils::slash_string(&root.join("contracts/Mid.sol"));
        let top = utils::slash_string(&top);
        let expected = format!(
            "// Dependency file: {base}\n\n// pragma solidity ^0.5.0;\ncontract Base {{}}\n\n\
             // Dependency file: {mid}\n\n// pragma solidity ^0.5.2;\n// import \"pkg/Base.sol\";\ncontract Mid is Base {{}}\n\n\
             // Root file: {top}\n\npragma solidity ^0.5.2;\n// import \"./Mid.sol\";\n// import \"pkg/Base.sol\";\ncontract Top is Mid {{}}\n"
        );
        assert_eq!(flat, expected);
        assert_eq!(flattener.flatten(root.join("contracts/Top.sol")).unwrap(), flat);
    }

    #[test]
    fn terminates_on_cycles() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root.join("A.sol"), "import \"./B.sol\";\ncontract A {}").unwrap();
        write(root.join("B.sol"), "import \"./A.sol\";\ncontract B {}").unwrap();

        let flat = flattener(root).flatten(root.join("A.sol")).unwrap();
        assert_eq!(flat.matches("contract A {}").count(), 1);
        assert_eq!(flat.matches("contract B {}").count(), 1);
        assert!(flat.find("contract B").unwrap() < flat.find("contract A").unwrap());
    }

    #[test]
    fn missing_import_is_unresolved() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root.join("A.sol"), "import \"missing/Lib.sol\";\ncontract A {}").unwrap();

        match flattener(root).flatten(root.join("A.sol")).unwrap_err() {
            CompilerError::UnresolvedImport { import, reason, .. } => {
                assert_eq!(import, "missing/Lib.sol");
                assert_eq!(reason, "File not found: missing/Lib.sol");
            }
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn ignores_commented_out_imports() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let source = "pragma solidity ^0.5.0;\n// import \"./Removed.sol\";\n/* import \"./Old.sol\"; */\ncontract A {}";
        write(root.join("A.sol"), source).unwrap();
        // a stale file must not be pulled in by a dead import
        write(root.join("Old.sol"), "contract Old {}").unwrap();

        let flat = flattener(root).flatten(root.join("A.sol")).unwrap();
        assert_eq!(flat, format!("{ROOT_HEADER}{}\n\n{source}\n", slash(&root.join("A.sol"))));
        assert!(!flat.contains("contract Old"));
    }

    #[test]
    fn leaves_imports_inside_block_comments_alone() {
        let source = "/*\nimport \"./A.sol\";\n*/\nimport \"./B.sol\";";
        assert_eq!(
            comment_directives(source, false),
            "/*\nimport \"./A.sol\";\n*/\n// import \"./B.sol\";"
        );
    }

    fn slash(path: &Path) -> String {
        utils::slash_string(&utils::normalize_path(path))
    }
}
