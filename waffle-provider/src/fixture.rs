//! Snapshot backed fixtures.
//!
//! A fixture is an expensive setup routine, typically deploying contracts. The first time it is
//! loaded the routine runs and the node state is snapshotted. Every later load reverts to that
//! snapshot and hands back the same result without running the routine again.
//!
//! ```
//! use ethers_core::types::{Address, U256};
//! use ethers_providers::{MockProvider, Provider};
//! use std::sync::Arc;
//! use waffle_provider::{Fixture, FixtureLoader};
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let (provider, mock) = Provider::mocked();
//! // the mock answers the last pushed response first
//! mock.push(U256::from(2))?; // evm_snapshot after revert
//! mock.push(true)?; // evm_revert
//! mock.push(U256::from(1))?; // evm_snapshot after setup
//! mock.push::<Vec<Address>, _>(vec![Address::zero()])?; // eth_accounts
//!
//! let deploy = Fixture::new(|_provider: Arc<Provider<MockProvider>>, accounts: Vec<Address>| async move {
//!     Ok::<_, std::io::Error>(accounts[0])
//! });
//!
//! let mut loader = FixtureLoader::with_environment(provider);
//! let first = loader.load(&deploy).await?;
//! let second = loader.load(&deploy).await?;
//! assert!(Arc::ptr_eq(&first, &second));
//! # Ok(())
//! # }
//! ```

use crate::Environment;
use ethers_core::types::{Address, U256};
use futures_util::future::{BoxFuture, FutureExt};
use std::{any::Any, error::Error, fmt, future::Future, sync::Arc};
use thiserror::Error;
use tracing::{debug, trace};

/// Type erased error returned by fixture routines and environment factories
pub type BoxError = Box<dyn Error + Send + Sync>;

type Routine<E, T> =
    dyn Fn(Arc<E>, Vec<Address>) -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync;

type Factory<E> = dyn Fn() -> Result<E, BoxError> + Send + Sync;

/// Errors of [`FixtureLoader::load`]
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The environment could not be created, snapshotted or reverted
    #[error("fixture environment failed: {0}")]
    Environment(#[source] BoxError),
    /// The setup routine failed, nothing was cached
    #[error("fixture setup failed: {0}")]
    Setup(#[source] BoxError),
    /// A cached result does not have the type the fixture returns
    #[error("cached fixture result has an unexpected type")]
    TypeMismatch,
}

impl FixtureError {
    fn environment(err: impl Error + Send + Sync + 'static) -> Self {
        FixtureError::Environment(Box::new(err))
    }
}

/// A setup routine, identified by reference.
///
/// Clones share the identity of the fixture they were cloned from. Two fixtures built from
/// identical closures are still different fixtures.
pub struct Fixture<E, T> {
    routine: Arc<Routine<E, T>>,
}

impl<E, T> Fixture<E, T>
where
    E: 'static,
    T: 'static,
{
    /// Wraps an async setup routine receiving the environment and the participant accounts
    pub fn new<F, Fut, Err>(routine: F) -> Self
    where
        F: Fn(Arc<E>, Vec<Address>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Err>> + Send + 'static,
        Err: Into<BoxError>,
    {
        let routine = move |env: Arc<E>, accounts: Vec<Address>| {
            routine(env, accounts).map(|res| res.map_err(Into::<BoxError>::into)).boxed()
        };
        Self { routine: Arc::new(routine) }
    }
}

impl<E, T> Fixture<E, T> {
    fn id(&self) -> usize {
        Arc::as_ptr(&self.routine) as *const () as usize
    }

    /// Whether both handles refer to the same routine
    pub fn same_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<E, T> Clone for Fixture<E, T> {
    fn clone(&self) -> Self {
        Self { routine: Arc::clone(&self.routine) }
    }
}

impl<E, T> fmt::Debug for Fixture<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture").field("id", &format_args!("{:#x}", self.id())).finish()
    }
}

struct Entry<E> {
    id: usize,
    // holds the routine so its address is not reused while cached
    _routine: Box<dyn Any + Send + Sync>,
    data: Arc<dyn Any + Send + Sync>,
    snapshot: U256,
    environment: Arc<E>,
}

/// Caches fixture results together with a snapshot of the state they produced.
///
/// Create one loader per test process and load every fixture through it. Loading takes
/// `&mut self`, so loads are serialized; reverts of different callers can not interleave.
pub struct FixtureLoader<E> {
    factory: Option<Box<Factory<E>>>,
    environment: Option<Arc<E>>,
    accounts: Option<Vec<Address>>,
    entries: Vec<Entry<E>>,
}

impl<E: Environment + 'static> FixtureLoader<E> {
    /// A loader creating a fresh environment for every fixture it has not seen yet
    pub fn new<F, Err>(factory: F) -> Self
    where
        F: Fn() -> Result<E, Err> + Send + Sync + 'static,
        Err: Into<BoxError>,
    {
        Self {
            factory: Some(Box::new(move || factory().map_err(Into::into))),
            environment: None,
            accounts: None,
            entries: Vec::new(),
        }
    }

    /// A loader running every fixture against the given environment
    pub fn with_environment(environment: E) -> Self {
        Self {
            factory: None,
            environment: Some(Arc::new(environment)),
            accounts: None,
            entries: Vec::new(),
        }
    }

    /// Hands these accounts to fixture routines instead of asking the environment
    #[must_use]
    pub fn accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Number of fixtures cached so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no fixture was loaded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the result of `fixture`, running it only if it was never loaded before.
    ///
    /// On a cache hit the environment is reverted to the state right after the routine ran and
    /// a new snapshot is taken for the next load.
    pub async fn load<T>(&mut self, fixture: &Fixture<E, T>) -> Result<Arc<T>, FixtureError>
    where
        T: Send + Sync + 'static,
    {
        let id = fixture.id();
        if let Some(pos) = self.entries.iter().position(|entry| entry.id == id) {
            let entry = &mut self.entries[pos];
            debug!(fixture = ?fixture, snapshot = %entry.snapshot, "fixture cache hit");
            entry.environment.revert_to(entry.snapshot).await.map_err(FixtureError::environment)?;
            match entry.environment.snapshot().await {
                Ok(snapshot) => entry.snapshot = snapshot,
                Err(err) => {
                    // the revert used up the stored snapshot, the next load has to set up again
                    debug!(fixture = ?fixture, error = %err, "dropping fixture without snapshot");
                    self.entries.remove(pos);
                    return Err(FixtureError::environment(err))
                }
            }
            trace!(snapshot = %entry.snapshot, "took new snapshot");
            return entry.data.clone().downcast::<T>().map_err(|_| FixtureError::TypeMismatch)
        }

        debug!(fixture = ?fixture, "fixture cache miss");
        let environment = self.environment()?;
        let accounts = match &self.accounts {
            Some(accounts) => accounts.clone(),
            None => environment.accounts().await.map_err(FixtureError::environment)?,
        };

        let data = Arc::new((fixture.routine)(environment.clone(), accounts).await.map_err(
            |err| {
                debug!(fixture = ?fixture, error = %err, "fixture setup failed");
                FixtureError::Setup(err)
            },
        )?);
        let snapshot = environment.snapshot().await.map_err(FixtureError::environment)?;
        trace!(snapshot = %snapshot, "cached fixture");

        self.entries.push(Entry {
            id,
            _routine: Box::new(fixture.clone()),
            data: data.clone(),
            snapshot,
            environment,
        });
        Ok(data)
    }

    fn environment(&self) -> Result<Arc<E>, FixtureError> {
        if let Some(environment) = &self.environment {
            return Ok(environment.clone())
        }
        match &self.factory {
            Some(factory) => factory().map(Arc::new).map_err(FixtureError::Environment),
            None => Err(FixtureError::Environment("no environment configured".into())),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for FixtureLoader<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureLoader")
            .field("factory", &self.factory.is_some())
            .field("environment", &self.environment)
            .field("accounts", &self.accounts)
            .field("cached", &self.entries.len())
            .finish()
    }
}
