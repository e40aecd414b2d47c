#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Waffle
//!
//! Compile, flatten and test Solidity projects.
//!
//! The crate re-exports two members:
//!
//! * [`compiler`] walks a project's sources, runs them through `solc` (native, docker or an
//!   in-process library), reports diagnostics and writes one artifact per contract. It also
//!   flattens sources into self contained files.
//! * [`provider`] talks to development nodes over JSON-RPC and caches expensive test setups
//!   behind node snapshots.
//!
//! A prelude imports the commonly used items.
//!
//! ```no_run
//! use waffle::prelude::*;
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("waffle.json")?;
//! let status = Project::from_config(config)?.compile().await?;
//! assert!(status.is_success());
//! # Ok(())
//! # }
//! ```

/// Building and flattening contracts
pub mod compiler {
    pub use waffle_compiler::*;
}

/// Development node access and snapshot fixtures
pub mod provider {
    pub use waffle_provider::*;
}

/// Easy imports of frequently used items
pub mod prelude {
    pub use waffle_compiler::{
        flatten_and_save, CompileStatus, CompilerKind, Config, Flattener, Project,
    };

    pub use waffle_provider::{
        Environment, Fixture, FixtureLoader, Http, MockProvider, Provider, ProviderError,
    };
}
