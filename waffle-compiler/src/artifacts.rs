//! Standard-json input and output types exchanged with `solc`

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::remappings::Remapping;

/// The language tag of every compiler input
pub const SOLIDITY: &str = "Solidity";

/// `(file, contract)` selector matching everything
pub const WILDCARD: &str = "*";

/// file -> contract -> selectors
pub type OutputSelection = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Input type `solc` expects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerInput {
    pub language: String,
    pub sources: BTreeMap<String, Source>,
    pub settings: Settings,
}

impl CompilerInput {
    /// Creates a new input for the given sources, requesting `selectors` for every contract
    pub fn new<I, S>(sources: BTreeMap<String, Source>, remappings: Vec<Remapping>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            language: SOLIDITY.to_string(),
            sources,
            settings: Settings::new(remappings, selectors),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub remappings: Vec<Remapping>,
    #[serde(default)]
    pub output_selection: OutputSelection,
}

impl Settings {
    pub fn new<I, S>(remappings: Vec<Remapping>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selectors = selectors.into_iter().map(Into::into).collect();
        let output_selection = BTreeMap::from([(
            WILDCARD.to_string(),
            BTreeMap::from([(WILDCARD.to_string(), selectors)]),
        )]);
        Self { remappings, output_selection }
    }

    /// Adds a selector for all files and contracts
    pub fn push_output_selection(&mut self, selector: impl Into<String>) {
        let selector = selector.into();
        let selectors = self
            .output_selection
            .entry(WILDCARD.to_string())
            .or_default()
            .entry(WILDCARD.to_string())
            .or_default();
        if !selectors.contains(&selector) {
            selectors.push(selector);
        }
    }
}

/// A source unit, either inlined or referenced by URL for the compiler to load itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Content { content: String },
    Urls { urls: Vec<String> },
}

impl Source {
    pub fn content(content: impl Into<String>) -> Self {
        Source::Content { content: content.into() }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Source::Urls { urls: vec![url.into()] }
    }
}

/// Output type `solc` produces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Diagnostic>>,
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, Contract>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, serde_json::Value>,
}

impl CompilerOutput {
    /// All diagnostics, empty if the compiler reported none
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// Whether any diagnostic is blocking, everything that is not a warning is
    pub fn has_error(&self) -> bool {
        self.diagnostics().iter().any(Diagnostic::is_blocking)
    }

    /// Whether there are diagnostics that are only warnings
    pub fn has_warning(&self) -> bool {
        self.diagnostics().iter().any(Diagnostic::is_warning)
    }

    /// The formatted messages of all diagnostics, one per diagnostic
    pub fn formatted_diagnostics(&self) -> Vec<&str> {
        self.diagnostics().iter().map(Diagnostic::formatted_message).collect()
    }

    /// Finds the first contract with the given name
    pub fn find(&self, contract: impl AsRef<str>) -> Option<&Contract> {
        let contract = contract.as_ref();
        self.contracts.values().find_map(|contracts| contracts.get(contract))
    }

    /// Iterate over all `(name, contract)` pairs
    pub fn contracts_iter(&self) -> impl Iterator<Item = (&String, &Contract)> {
        self.contracts.values().flatten()
    }
}

/// The output of a single contract
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// The Ethereum Contract ABI.
    /// See <https://docs.soliditylang.org/en/develop/abi-spec.html>
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// EVM-related outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evm: Option<Evm>,
    /// Everything else the compiler emitted, kept as is
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl Contract {
    /// The creation bytecode as a hex string, if requested
    pub fn bytecode(&self) -> Option<&str> {
        self.evm.as_ref()?.bytecode.as_ref().map(|b| b.object.as_str())
    }

    /// The runtime bytecode as a hex string, if requested
    pub fn deployed_bytecode(&self) -> Option<&str> {
        self.evm.as_ref()?.deployed_bytecode.as_ref().map(|b| b.object.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<Bytecode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_bytecode: Option<Bytecode>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bytecode {
    /// The bytecode as a hex string.
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcodes: Option<String>,
    /// The source mapping as a string. See the source mapping definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
    /// If given, this is an unlinked object.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub link_references: BTreeMap<String, serde_json::Value>,
}

/// A message emitted by the compiler.
///
/// Compilers emit structured objects, very old ones emit plain formatted strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Diagnostic {
    Structured(Error),
    Raw(String),
}

impl Diagnostic {
    /// The human readable message to show for this diagnostic
    pub fn formatted_message(&self) -> &str {
        match self {
            Diagnostic::Structured(err) => err.formatted_message.as_deref().unwrap_or(&err.message),
            Diagnostic::Raw(msg) => msg,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Structured(err) => err.severity(),
            Diagnostic::Raw(msg) => {
                if msg.contains("Warning:") {
                    Severity::Warning
                } else {
                    Severity::Error
                }
            }
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity().is_warning()
    }

    /// Anything that is not tagged as a warning blocks the build
    pub fn is_blocking(&self) -> bool {
        !self.is_warning()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.formatted_message())
    }
}

/// A structured compiler diagnostic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
}

impl Error {
    /// Classifies by the `severity` tag, falling back to the `type` tag for compilers that do not
    /// emit one
    pub fn severity(&self) -> Severity {
        let tag = if self.severity.is_empty() { &self.r#type } else { &self.severity };
        if tag.eq_ignore_ascii_case("warning") {
            Severity::Warning
        } else if tag.eq_ignore_ascii_case("info") {
            Severity::Info
        } else {
            Severity::Error
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start: i32,
    pub end: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }

    pub fn is_info(&self) -> bool {
        matches!(self, Severity::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("Error"),
            Severity::Warning => f.write_str("Warning"),
            Severity::Info => f.write_str("Info"),
        }
    }
}
