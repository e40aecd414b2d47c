use async_trait::async_trait;
use auto_impl::auto_impl;
use ethers_core::types::{Address, U256};
use ethers_providers::{JsonRpcClient, Middleware, Provider, ProviderError};
use std::{error::Error, fmt::Debug};
use thiserror::Error;

/// A blockchain environment whose state can be captured and restored.
///
/// Snapshot ids are opaque. An id is only guaranteed to be usable for a single revert, after
/// which a fresh snapshot has to be taken.
#[async_trait]
#[auto_impl(&, Arc, Box)]
pub trait Environment: Debug + Send + Sync {
    /// Error returned by the node
    type Error: Error + Send + Sync + 'static;

    /// Captures the current state and returns its id
    async fn snapshot(&self) -> Result<U256, Self::Error>;

    /// Restores the state captured by `id`
    async fn revert_to(&self, id: U256) -> Result<(), Self::Error>;

    /// The participant accounts handed to fixture routines
    async fn accounts(&self) -> Result<Vec<Address>, Self::Error>;
}

#[derive(Debug, Error)]
/// Errors of development nodes driven through [`Environment`]
pub enum DevRpcError {
    /// The request itself failed
    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    /// The node refused to revert, usually because the snapshot was already reverted to
    #[error("Could not revert to snapshot {0}")]
    NoSnapshot(U256),
}

/// Development nodes like ganache, hardhat or anvil expose their state snapshots over
/// `evm_snapshot` and `evm_revert`.
///
/// ```no_run
/// use ethers_providers::{Http, Provider};
/// use std::convert::TryFrom;
/// use waffle_provider::Environment;
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Provider::<Http>::try_from("http://localhost:8545")?;
/// let snapshot = provider.snapshot().await?;
/// // ... change some state
/// provider.revert_to(snapshot).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
impl<P: JsonRpcClient> Environment for Provider<P> {
    type Error = DevRpcError;

    /// Ganache, Hardhat and Anvil increment the snapshot id even if no state has changed
    async fn snapshot(&self) -> Result<U256, DevRpcError> {
        Ok(self.request::<(), U256>("evm_snapshot", ()).await?)
    }

    async fn revert_to(&self, id: U256) -> Result<(), DevRpcError> {
        let ok = self.request::<[U256; 1], bool>("evm_revert", [id]).await?;
        if ok {
            Ok(())
        } else {
            Err(DevRpcError::NoSnapshot(id))
        }
    }

    async fn accounts(&self) -> Result<Vec<Address>, DevRpcError> {
        Ok(self.get_accounts().await?)
    }
}
