use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{query_as, Pool, Postgres};

use crate::model::{MatchModel, NewMatch};

/// Storage for the `matches` table as seen by the handlers.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Newest first, at most `limit` rows.
    async fn get_matches(&self, limit: i64) -> Result<Vec<MatchModel>>;
    async fn create_match(&self, new_match: NewMatch) -> Result<MatchModel>;
}

pub async fn crud_get_matches(db: &Pool<Postgres>, limit: i64) -> Result<Vec<MatchModel>> {
    let matches: Vec<MatchModel> = sqlx::query_as(
        r#"
        SELECT id, status, start_time, end_time, home_score, away_score, created_at
        FROM matches
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
    .map_err(|e| anyhow!("Unable to query model from db: {}", e))?;

    Ok(matches)
}

pub async fn crud_create_match(db: &Pool<Postgres>, new_match: &NewMatch) -> Result<MatchModel> {
    let m: MatchModel = query_as(
        r#"
        INSERT INTO matches (status, start_time, end_time, home_score, away_score)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(new_match.status)
    .bind(new_match.start_time)
    .bind(new_match.end_time)
    .bind(new_match.home_score)
    .bind(new_match.away_score)
    .fetch_one(db)
    .await
    .map_err(|e| anyhow!("Unable to insert model into db: {}", e))?;

    Ok(m)
}

#[async_trait]
impl MatchStore for Pool<Postgres> {
    async fn get_matches(&self, limit: i64) -> Result<Vec<MatchModel>> {
        crud_get_matches(self, limit).await
    }

    async fn create_match(&self, new_match: NewMatch) -> Result<MatchModel> {
        crud_create_match(self, &new_match).await
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    /// Keeps rows in insertion order; `created_at` is strictly increasing.
    #[derive(Default)]
    pub struct MemoryStore {
        rows: Mutex<Vec<MatchModel>>,
    }

    impl MemoryStore {
        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MatchStore for MemoryStore {
        async fn get_matches(&self, limit: i64) -> Result<Vec<MatchModel>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .rev()
                .take(usize::try_from(limit)?)
                .cloned()
                .collect())
        }

        async fn create_match(&self, new_match: NewMatch) -> Result<MatchModel> {
            let mut rows = self.rows.lock().unwrap();
            let mut created_at = Utc::now();
            if let Some(last) = rows.last() {
                created_at = created_at.max(last.created_at + Duration::microseconds(1));
            }

            let m = MatchModel {
                id: Uuid::new_v4(),
                status: new_match.status,
                start_time: new_match.start_time,
                end_time: new_match.end_time,
                home_score: new_match.home_score,
                away_score: new_match.away_score,
                created_at,
            };
            rows.push(m.clone());
            Ok(m)
        }
    }

    /// Fails every call the way an unreachable database would.
    pub struct BrokenStore;

    #[async_trait]
    impl MatchStore for BrokenStore {
        async fn get_matches(&self, _limit: i64) -> Result<Vec<MatchModel>> {
            Err(anyhow!("Unable to query model from db: connection refused"))
        }

        async fn create_match(&self, _new_match: NewMatch) -> Result<MatchModel> {
            Err(anyhow!("Unable to insert model into db: connection refused"))
        }
    }
}
