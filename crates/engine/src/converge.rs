// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Find-or-create convergence for idempotent batch jobs
//!
//! A job first looks for the record it is meant to produce and only creates
//! it when missing. When two runs race, the loser's create fails with a
//! uniqueness violation; that is read as "someone else converged it" and
//! resolved by looking the record up again.

use crate::error::ConvergeError;
use async_trait::async_trait;

/// Errors that can tell a uniqueness violation apart from other failures
pub trait UniqueViolation {
    fn is_unique_violation(&self) -> bool;
}

/// A record that is looked up before it is created
#[async_trait]
pub trait FindOrCreate: Send + Sync {
    type Record: Send;
    type Error: UniqueViolation + Send;

    async fn find(&self) -> Result<Option<Self::Record>, Self::Error>;

    async fn create(&self) -> Result<Self::Record, Self::Error>;
}

/// How a record came to exist
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Converged<R> {
    /// Already there before this run
    Found(R),
    /// Created by this run
    Created(R),
    /// Created concurrently by another run; found on the second lookup
    Recovered(R),
}

impl<R> Converged<R> {
    pub fn into_inner(self) -> R {
        match self {
            Converged::Found(r) | Converged::Created(r) | Converged::Recovered(r) => r,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Converged::Created(_))
    }
}

/// Look up, create if missing, and retry a lost create race as a lookup
pub async fn find_or_create<F>(entity: &F) -> Result<Converged<F::Record>, ConvergeError<F::Error>>
where
    F: FindOrCreate + ?Sized,
{
    if let Some(record) = entity.find().await.map_err(ConvergeError::Inner)? {
        return Ok(Converged::Found(record));
    }

    match entity.create().await {
        Ok(record) => Ok(Converged::Created(record)),
        Err(e) if e.is_unique_violation() => {
            tracing::debug!("create lost a uniqueness race, looking up again");
            match entity.find().await.map_err(ConvergeError::Inner)? {
                Some(record) => Ok(Converged::Recovered(record)),
                None => Err(ConvergeError::Vanished),
            }
        }
        Err(e) => Err(ConvergeError::Inner(e)),
    }
}

#[cfg(test)]
#[path = "converge_tests.rs"]
mod tests;
