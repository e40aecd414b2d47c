//! Utility functions

use crate::error::{CompilerError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    cmp::Ordering,
    path::{Component, Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// A regex that matches a whole solidity import statement, the imported path is captured by one
/// of the named groups "p1".."p4", depending on the import form.
///
/// Supported forms:
///   - `import "path";` and `import "path" as Name;`
///   - `import * as Name from "path";`
///   - `import {A, B as C} from "path";`
pub static RE_SOL_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\bimport\s+(?:(?:"(?P<p1>[^"]*)"|'(?P<p2>[^']*)')(?:\s+as\s+\w+)?\s*;|[^;]*?\bfrom\s+(?:"(?P<p3>[^"]*)"|'(?P<p4>[^']*)')\s*;)"#,
    )
    .unwrap()
});

/// A regex that matches the version part of a solidity pragma
/// as follows: `pragma solidity ^0.5.2;` => `^0.5.2`
pub static RE_SOL_PRAGMA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pragma\s+solidity\s+(?P<version>.+?);").unwrap());

/// A regex that matches an SPDX license identifier comment line
pub static RE_SOL_SPDX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*//\s*SPDX-License-Identifier:").unwrap());

/// Returns all path parts from any solidity import statement in a string,
/// `import "./contracts/Contract.sol";` -> `"./contracts/Contract.sol"`.
///
/// See also <https://docs.soliditylang.org/en/v0.8.9/grammar.html>
pub fn find_import_paths(contract: &str) -> Vec<&str> {
    RE_SOL_IMPORT
        .captures_iter(contract)
        .filter_map(|cap| {
            cap.name("p1").or_else(|| cap.name("p2")).or_else(|| cap.name("p3")).or_else(|| cap.name("p4"))
        })
        .map(|m| m.as_str())
        .collect()
}

/// Replaces every comment with spaces, keeping line breaks and byte offsets intact, so
/// commented out code like `// import "./Old.sol";` is invisible to the regexes above.
///
/// String literals are kept as they are, `"//"` inside a string does not start a comment.
pub fn blank_comments(source: &str) -> String {
    #[derive(Clone, Copy)]
    enum State {
        Code,
        Line,
        Block,
        Str(char),
    }

    fn blank(out: &mut String, c: char) {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            State::Code => match (c, chars.peek()) {
                ('/', Some(&'/')) => {
                    chars.next();
                    out.push_str("  ");
                    state = State::Line;
                }
                ('/', Some(&'*')) => {
                    chars.next();
                    out.push_str("  ");
                    state = State::Block;
                }
                ('"' | '\'', _) => {
                    out.push(c);
                    state = State::Str(c);
                }
                _ => out.push(c),
            },
            State::Line if c == '\n' => {
                out.push(c);
                state = State::Code;
            }
            State::Block if c == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                out.push_str("  ");
                state = State::Code;
            }
            State::Line | State::Block if c == '\n' => out.push(c),
            State::Line | State::Block => blank(&mut out, c),
            State::Str(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote || c == '\n' {
                    state = State::Code;
                }
            }
        }
    }
    out
}

/// Returns the solidity version pragma from the given input:
/// `pragma solidity ^0.5.2;` => `^0.5.2`
pub fn find_version_pragma(contract: &str) -> Option<&str> {
    RE_SOL_PRAGMA_VERSION.captures(contract)?.name("version").map(|m| m.as_str())
}

/// Returns every file under `root` whose name ends with `extension`.
///
/// Within a directory, files come first in name order, then subdirectories are descended in
/// reverse name order. This is the order of a stack based walk that pushes directories as it
/// finds them. Every matching file is yielded exactly once.
///
/// Fails with [`CompilerError::NotFound`] if `root` is not a directory.
///
/// # Example
///
/// ```no_run
/// use waffle_compiler::utils;
/// let sources = utils::source_files("./contracts", ".sol").unwrap();
/// ```
pub fn source_files(root: impl AsRef<Path>, extension: &str) -> Result<Vec<PathBuf>> {
    let root = normalize_path(root.as_ref());
    if !root.is_dir() {
        return Err(CompilerError::NotFound(root))
    }
    tracing::trace!("walking sources at {}", root.display());
    let files: Vec<_> = WalkDir::new(&root)
        .follow_links(true)
        .sort_by(stack_order)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() => {
                e.file_name().to_string_lossy().ends_with(extension).then(|| Ok(normalize_path(e.path())))
            }
            Ok(_) => None,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                Some(Err(CompilerError::io(err.into(), path)))
            }
        })
        .collect::<Result<_>>()?;
    tracing::trace!("found {} source files in {}", files.len(), root.display());
    Ok(files)
}

fn stack_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    match (a.file_type().is_dir(), b.file_type().is_dir()) {
        (false, false) => a.file_name().cmp(b.file_name()),
        (true, true) => b.file_name().cmp(a.file_name()),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
    }
}

/// Lexically normalizes a path: drops `.` components and folds `..` into the preceding
/// component, without touching the filesystem.
///
/// `./contracts/../lib/A.sol` -> `lib/A.sol`
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Returns the absolute form of `path`, resolved against the current working directory.
///
/// Unlike `canonicalize` this does not require the path to exist and keeps symlinks.
pub fn absolute(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(normalize_path(path))
    }
    let cwd = std::env::current_dir().map_err(|err| CompilerError::io(err, path))?;
    Ok(normalize_path(&cwd.join(path)))
}

/// Canonicalize the path, platform-agnostic
///
/// On windows this will ensure the path only consists of `/` separators
pub fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    dunce::canonicalize(path).map_err(|err| CompilerError::io(err, path))
}

/// Renders a path with `/` separators on every platform
pub fn slash_string(path: &Path) -> String {
    use path_slash::PathExt;
    path.to_slash_lossy().into_owned()
}
