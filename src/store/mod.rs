//! Persistence of subscriber records.
//!
//! Every lifecycle operation runs inside a single transaction: a
//! `SubscriptionDatabase` hands out a `SubscriptionStore` with `begin`, the
//! operation reads and writes through it, and `commit` makes the changes
//! durable. A store that is dropped without being committed rolls back.

mod memory;
mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
pub use memory::InMemoryDatabase;
pub use postgres::PgDatabase;

use crate::domain::NewSubscriber;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("A subscriber with this email already exists")]
    DuplicateEmail,
    #[error("A subscriber with this token already exists")]
    DuplicateToken,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for StoreError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Source of transactions.
#[async_trait]
pub trait SubscriptionDatabase: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn SubscriptionStore>, StoreError>;
}

/// One open transaction over the subscriber records.
///
/// Lookups are exact matches. `insert` enforces uniqueness of both email and
/// token and reports which one was violated.
#[async_trait]
pub trait SubscriptionStore: Send {
    async fn find_by_email(
        &mut self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError>;

    async fn find_by_token(
        &mut self,
        token: &SubscriptionToken,
    ) -> Result<Option<Subscriber>, StoreError>;

    async fn insert(
        &mut self,
        new_sub: &NewSubscriber,
    ) -> Result<Subscriber, StoreError>;

    async fn set_confirmed(
        &mut self,
        subscriber: &Subscriber,
    ) -> Result<(), StoreError>;

    async fn delete(
        &mut self,
        subscriber: &Subscriber,
    ) -> Result<(), StoreError>;

    async fn list_confirmed(&mut self) -> Result<Vec<Subscriber>, StoreError>;

    /// This is the last action in the transaction
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
