use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::StoreError;
use super::SubscriptionDatabase;
use super::SubscriptionStore;
use crate::domain::NewSubscriber;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;

/// Process-local store. A transaction holds the lock for its whole lifetime
/// and works on a copy of the records, which replaces the shared records only
/// on `commit`.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self { Self::default() }

    /// Committed records, in insertion order
    pub async fn snapshot(&self) -> Vec<Subscriber> { self.subscribers.lock().await.clone() }
}

#[async_trait]
impl SubscriptionDatabase for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn SubscriptionStore>, StoreError> {
        let guard = self.subscribers.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryStore { guard, working }))
    }
}

struct InMemoryStore {
    guard: OwnedMutexGuard<Vec<Subscriber>>,
    working: Vec<Subscriber>,
}

impl InMemoryStore {
    fn position(
        &self,
        subscriber: &Subscriber,
    ) -> Option<usize> {
        self.working.iter().position(|s| s.id == subscriber.id)
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn find_by_email(
        &mut self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.working.iter().find(|s| &s.email == email).cloned())
    }

    async fn find_by_token(
        &mut self,
        token: &SubscriptionToken,
    ) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.working.iter().find(|s| &s.token == token).cloned())
    }

    async fn insert(
        &mut self,
        new_sub: &NewSubscriber,
    ) -> Result<Subscriber, StoreError> {
        if self.working.iter().any(|s| s.token == new_sub.token) {
            return Err(StoreError::DuplicateToken);
        }
        if self.working.iter().any(|s| s.email == new_sub.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: new_sub.email.clone(),
            token: new_sub.token.clone(),
            is_confirmed: false,
            subscribed_at: Utc::now(),
        };
        self.working.push(subscriber.clone());
        Ok(subscriber)
    }

    async fn set_confirmed(
        &mut self,
        subscriber: &Subscriber,
    ) -> Result<(), StoreError> {
        let idx = self
            .position(subscriber)
            .ok_or_else(|| anyhow::anyhow!("No subscriber with id {}", subscriber.id))?;
        self.working[idx].is_confirmed = true;
        Ok(())
    }

    async fn delete(
        &mut self,
        subscriber: &Subscriber,
    ) -> Result<(), StoreError> {
        let idx = self
            .position(subscriber)
            .ok_or_else(|| anyhow::anyhow!("No subscriber with id {}", subscriber.id))?;
        self.working.remove(idx);
        Ok(())
    }

    async fn list_confirmed(&mut self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self
            .working
            .iter()
            .filter(|s| s.is_confirmed)
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
