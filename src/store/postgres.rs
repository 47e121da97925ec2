use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;
use uuid::Uuid;

use super::StoreError;
use super::SubscriptionDatabase;
use super::SubscriptionStore;
use crate::domain::NewSubscriber;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;

type PgTransaction = Transaction<'static, Postgres>;

/// `subscribers` table in Postgres. Queries are checked at runtime
/// (`sqlx::query_as`), so building does not require a live db.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[async_trait]
impl SubscriptionDatabase for PgDatabase {
    async fn begin(&self) -> Result<Box<dyn SubscriptionStore>, StoreError> {
        let transaction = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a Postgres connection from the pool")?;
        Ok(Box::new(PgStore { transaction }))
    }
}

struct PgStore {
    transaction: PgTransaction,
}

/// Raw row; emails and tokens are re-parsed on the way out, since we cannot
/// assume that what is in the db is (still) valid.
#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    token: String,
    is_confirmed: bool,
    subscribed_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = anyhow::Error;
    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Subscriber {
            id: row.id,
            email: SubscriberEmail::parse(row.email).map_err(anyhow::Error::msg)?,
            token: SubscriptionToken::parse(row.token).map_err(anyhow::Error::msg)?,
            is_confirmed: row.is_confirmed,
            subscribed_at: row.subscribed_at,
        })
    }
}

fn into_subscriber(row: Option<SubscriberRow>) -> Result<Option<Subscriber>, StoreError> {
    Ok(row
        .map(Subscriber::try_from)
        .transpose()
        .context("Stored subscriber is invalid")?)
}

#[async_trait]
impl SubscriptionStore for PgStore {
    #[tracing::instrument(name = "Looking up subscriber by email", skip(self))]
    async fn find_by_email(
        &mut self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, token, is_confirmed, subscribed_at
            FROM subscribers
            WHERE email = $1
            "#,
        )
        .bind(email.as_ref())
        .fetch_optional(&mut *self.transaction)
        .await
        .context("Failed to query subscribers by email")?;
        into_subscriber(row)
    }

    #[tracing::instrument(name = "Looking up subscriber by token", skip_all)]
    async fn find_by_token(
        &mut self,
        token: &SubscriptionToken,
    ) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, token, is_confirmed, subscribed_at
            FROM subscribers
            WHERE token = $1
            "#,
        )
        .bind(token.as_ref())
        .fetch_optional(&mut *self.transaction)
        .await
        .context("Failed to query subscribers by token")?;
        into_subscriber(row)
    }

    /// `ON CONFLICT DO NOTHING` keeps the transaction usable after a
    /// violation (a failed statement would abort it), so the caller can retry
    /// with another token in the same transaction.
    #[tracing::instrument(
        name = "INSERTing new subscriber into db",
        skip_all,
        fields(subscriber_email = %new_sub.email)
    )]
    async fn insert(
        &mut self,
        new_sub: &NewSubscriber,
    ) -> Result<Subscriber, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (id, email, token, is_confirmed, subscribed_at)
            VALUES ($1, $2, $3, false, $4)
            ON CONFLICT DO NOTHING
            RETURNING id, email, token, is_confirmed, subscribed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_sub.email.as_ref())
        .bind(new_sub.token.as_ref())
        .bind(Utc::now())
        .fetch_optional(&mut *self.transaction)
        .await
        .context("Failed to insert new subscriber")?;

        if let Some(row) = row {
            return Ok(Subscriber::try_from(row)?);
        }

        let token_taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM subscribers WHERE token = $1)")
                .bind(new_sub.token.as_ref())
                .fetch_one(&mut *self.transaction)
                .await
                .context("Failed to check for token collision")?;

        match token_taken {
            true => Err(StoreError::DuplicateToken),
            false => Err(StoreError::DuplicateEmail),
        }
    }

    #[tracing::instrument(name = "Changing status of subscriber", skip_all, fields(id = %subscriber.id))]
    async fn set_confirmed(
        &mut self,
        subscriber: &Subscriber,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE subscribers SET is_confirmed = true WHERE id = $1")
            .bind(subscriber.id)
            .execute(&mut *self.transaction)
            .await
            .context("Failed to confirm subscriber")?;
        Ok(())
    }

    #[tracing::instrument(name = "DELETEing subscriber from db", skip_all, fields(id = %subscriber.id))]
    async fn delete(
        &mut self,
        subscriber: &Subscriber,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(subscriber.id)
            .execute(&mut *self.transaction)
            .await
            .context("Failed to delete subscriber")?;
        Ok(())
    }

    #[tracing::instrument(name = "Getting list of confirmed subscribers", skip(self))]
    async fn list_confirmed(&mut self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, token, is_confirmed, subscribed_at
            FROM subscribers
            WHERE is_confirmed = true
            ORDER BY subscribed_at
            "#,
        )
        .fetch_all(&mut *self.transaction)
        .await
        .context("Failed to list confirmed subscribers")?;

        // a row that no longer parses is skipped rather than failing the whole
        // list
        let subs = rows
            .into_iter()
            .filter_map(|row| match Subscriber::try_from(row) {
                Ok(sub) => Some(sub),
                Err(e) => {
                    tracing::warn!(e.cause_chain=?e, "skipping invalid subscriber");
                    None
                }
            })
            .collect();
        Ok(subs)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.transaction
            .commit()
            .await
            .context("Failed to commit SQL transaction")?;
        Ok(())
    }
}
