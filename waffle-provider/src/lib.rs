#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
#![allow(clippy::type_complexity)]
#![doc = include_str!("../README.md")]

mod environment;
pub use environment::{DevRpcError, Environment};

pub mod fixture;
pub use fixture::{BoxError, Fixture, FixtureError, FixtureLoader};

pub use ethers_providers::{Http, JsonRpcClient, MockProvider, Provider, ProviderError};
