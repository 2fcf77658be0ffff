use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    postgres::{PgArguments, PgPoolOptions, PgRow},
    FromRow, PgPool, Postgres,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{Config, ConfigError, DataSource},
    memory::{self, MemoryStore},
};

pub type PgQueryAs<'q, T> = sqlx::query::QueryAs<'q, Postgres, T, PgArguments>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("duplicate value: {0}")]
    Conflict(String),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt row: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// A lookup value for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Id(Uuid),
    Text(&'a str),
}

/// A row type that both backends can persist.
pub trait Record:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    /// Column order expected by `bind`. `id` is always first.
    const COLUMNS: &'static [&'static str];
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn bind<'q>(&self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self>;

    fn key(&self, _column: &str) -> Option<Key<'_>> {
        None
    }
}

fn bind_key<'q, T>(query: PgQueryAs<'q, T>, key: Key<'_>) -> PgQueryAs<'q, T> {
    match key {
        Key::Id(id) => query.bind(id),
        Key::Text(text) => query.bind(text.to_string()),
    }
}

pub async fn get_db_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub async fn open_store(config: &Config) -> Result<Store, StoreError> {
    match config.data_source {
        DataSource::Live => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let pool = get_db_pool(url, config.max_connections).await?;
            info!("connected to postgres (max {} connections)", config.max_connections);
            Ok(Store::Postgres(PgStore::new(pool)))
        }
        DataSource::Mock => {
            let store = MemoryStore::default();
            if config.seed_demo_data {
                memory::seed_demo_data(&store).await?;
                info!("seeded demo data, admin user id {}", memory::DEMO_ADMIN_ID);
            }
            Ok(Store::Memory(store))
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let sql = format!("SELECT * FROM {} ORDER BY created_at DESC", T::TABLE);
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn list_by<T: Record>(&self, column: &str, key: Key<'_>) -> Result<Vec<T>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1 ORDER BY created_at DESC",
            T::TABLE,
            column
        );
        let query = bind_key(sqlx::query_as::<_, T>(&sql), key);
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn get<T: Record>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", T::TABLE);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by<T: Record>(&self, column: &str, key: Key<'_>) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE {} = $1 LIMIT 1", T::TABLE, column);
        let query = bind_key(sqlx::query_as::<_, T>(&sql), key);
        Ok(query.fetch_optional(&self.pool).await?)
    }

    pub async fn insert<T: Record>(&self, row: &T) -> Result<T, StoreError> {
        let placeholders = (1..=T::COLUMNS.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            T::TABLE,
            T::COLUMNS.join(", "),
            placeholders
        );
        Ok(row.bind(sqlx::query_as::<_, T>(&sql)).fetch_one(&self.pool).await?)
    }

    pub async fn update<T: Record>(&self, row: &T) -> Result<Option<T>, StoreError> {
        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, column)| format!("{column} = ${}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = $1 RETURNING *",
            T::TABLE,
            assignments
        );
        Ok(row
            .bind(sqlx::query_as::<_, T>(&sql))
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn delete<T: Record>(&self, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// The data source handed to every handler.
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub fn kind(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "live",
            Store::Memory(_) => "mock",
        }
    }

    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        match self {
            Store::Postgres(pg) => pg.list().await,
            Store::Memory(mem) => mem.list().await,
        }
    }

    pub async fn list_by<T: Record>(&self, column: &str, key: Key<'_>) -> Result<Vec<T>, StoreError> {
        match self {
            Store::Postgres(pg) => pg.list_by(column, key).await,
            Store::Memory(mem) => mem.list_by(column, key).await,
        }
    }

    pub async fn get<T: Record>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self {
            Store::Postgres(pg) => pg.get(id).await,
            Store::Memory(mem) => mem.get(id).await,
        }
    }

    pub async fn find_by<T: Record>(&self, column: &str, key: Key<'_>) -> Result<Option<T>, StoreError> {
        match self {
            Store::Postgres(pg) => pg.find_by(column, key).await,
            Store::Memory(mem) => mem.find_by(column, key).await,
        }
    }

    pub async fn insert<T: Record>(&self, row: &T) -> Result<T, StoreError> {
        match self {
            Store::Postgres(pg) => pg.insert(row).await,
            Store::Memory(mem) => mem.insert(row).await,
        }
    }

    pub async fn update<T: Record>(&self, row: &T) -> Result<Option<T>, StoreError> {
        match self {
            Store::Postgres(pg) => pg.update(row).await,
            Store::Memory(mem) => mem.update(row).await,
        }
    }

    pub async fn delete<T: Record>(&self, id: Uuid) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(pg) => pg.delete::<T>(id).await,
            Store::Memory(mem) => mem.delete::<T>(id).await,
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Store::Postgres(pg) => pg.ping().await,
            Store::Memory(_) => Ok(()),
        }
    }
}
