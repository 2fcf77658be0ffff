use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{Key, Record, StoreError},
    models::{BlogPost, EventType, Package, PortfolioItem, Testimonial, User, UserRole},
};

pub const DEMO_ADMIN_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0001);

type Table = BTreeMap<Uuid, Value>;

/// In-process store backing the mock data source and handler tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

fn decode<T: Record>(table: &Table) -> Result<Vec<T>, StoreError> {
    let mut rows = table
        .values()
        .cloned()
        .map(serde_json::from_value::<T>)
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    Ok(rows)
}

fn check_unique<T: Record>(table: &Table, row: &T) -> Result<(), StoreError> {
    for column in T::UNIQUE {
        let Some(key) = row.key(column) else { continue };
        for existing in decode::<T>(table)? {
            if existing.id() != row.id() && existing.key(column) == Some(key) {
                return Err(StoreError::Conflict(format!(
                    "{}.{} already taken",
                    T::TABLE,
                    column
                )));
            }
        }
    }
    Ok(())
}

impl MemoryStore {
    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let tables = self.tables.read().await;
        match tables.get(T::TABLE) {
            Some(table) => decode(table),
            None => Ok(Vec::new()),
        }
    }

    pub async fn list_by<T: Record>(&self, column: &str, key: Key<'_>) -> Result<Vec<T>, StoreError> {
        let rows = self.list::<T>().await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.key(column) == Some(key))
            .collect())
    }

    pub async fn get<T: Record>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let tables = self.tables.read().await;
        let value = tables.get(T::TABLE).and_then(|table| table.get(&id)).cloned();
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    pub async fn find_by<T: Record>(&self, column: &str, key: Key<'_>) -> Result<Option<T>, StoreError> {
        Ok(self.list_by::<T>(column, key).await?.into_iter().next())
    }

    pub async fn insert<T: Record>(&self, row: &T) -> Result<T, StoreError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();
        if table.contains_key(&row.id()) {
            return Err(StoreError::Conflict(format!("{}.id already taken", T::TABLE)));
        }
        check_unique(table, row)?;
        table.insert(row.id(), serde_json::to_value(row)?);
        Ok(row.clone())
    }

    pub async fn update<T: Record>(&self, row: &T) -> Result<Option<T>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(T::TABLE) else {
            return Ok(None);
        };
        if !table.contains_key(&row.id()) {
            return Ok(None);
        }
        check_unique(table, row)?;
        table.insert(row.id(), serde_json::to_value(row)?);
        Ok(Some(row.clone()))
    }

    pub async fn delete<T: Record>(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(T::TABLE)
            .map(|table| table.remove(&id).is_some())
            .unwrap_or(false))
    }
}

pub async fn seed_demo_data(store: &MemoryStore) -> Result<(), StoreError> {
    let now = Utc::now();

    store
        .insert(&User {
            id: DEMO_ADMIN_ID,
            email: "studio@example.com".to_string(),
            full_name: "Studio Admin".to_string(),
            phone: None,
            role: UserRole::Admin,
            created_at: now,
        })
        .await?;

    let event_types = [
        ("Wedding", "wedding", "Full-day coverage from preparation to first dance."),
        ("Portrait", "portrait", "Studio or on-location portrait sessions."),
        ("Event", "event", "Corporate and private events."),
    ];
    for (offset, (name, slug, description)) in event_types.into_iter().enumerate() {
        let event_type = store
            .insert(&EventType {
                id: Uuid::new_v4(),
                name: name.to_string(),
                slug: slug.to_string(),
                description: Some(description.to_string()),
                created_at: now - Duration::minutes(offset as i64),
            })
            .await?;
        store
            .insert(&Package {
                id: Uuid::new_v4(),
                event_type_id: Some(event_type.id),
                name: format!("{name} Essentials"),
                description: None,
                price: Decimal::new(150_000 + 50_000 * offset as i64, 2),
                created_at: now,
            })
            .await?;
    }

    for (sort_order, (title, category, featured)) in [
        ("Golden hour vows", "wedding", true),
        ("Studio light study", "portrait", false),
        ("Harbour gala", "event", false),
    ]
    .into_iter()
    .enumerate()
    {
        store
            .insert(&PortfolioItem {
                id: Uuid::new_v4(),
                title: title.to_string(),
                category: Some(category.to_string()),
                image_url: format!("https://images.example.com/portfolio/{sort_order}.jpg"),
                description: None,
                featured,
                sort_order: sort_order as i32,
                created_at: now,
            })
            .await?;
    }

    store
        .insert(&Testimonial {
            id: Uuid::new_v4(),
            client_name: "Maya & Jonas".to_string(),
            quote: "Every photo tells the story of our day.".to_string(),
            rating: 5,
            approved: true,
            created_at: now,
        })
        .await?;

    store
        .insert(&BlogPost {
            id: Uuid::new_v4(),
            title: "Planning your engagement shoot".to_string(),
            slug: "planning-your-engagement-shoot".to_string(),
            excerpt: Some("Light, location and what to wear.".to_string()),
            body: "Start with the light. Golden hour is forgiving and warm.".to_string(),
            published: true,
            published_at: Some(now),
            created_at: now,
        })
        .await?;

    debug!("demo seed complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_type(slug: &str) -> EventType {
        EventType {
            id: Uuid::new_v4(),
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_get_update_delete() {
        let store = MemoryStore::default();
        let mut row = store.insert(&event_type("wedding")).await.unwrap();
        assert_eq!(store.get::<EventType>(row.id).await.unwrap().unwrap().slug, "wedding");

        row.name = "Weddings".to_string();
        let updated = store.update(&row).await.unwrap().unwrap();
        assert_eq!(updated.name, "Weddings");

        assert!(store.delete::<EventType>(row.id).await.unwrap());
        assert!(!store.delete::<EventType>(row.id).await.unwrap());
        assert!(store.get::<EventType>(row.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_columns_conflict() {
        let store = MemoryStore::default();
        store.insert(&event_type("portrait")).await.unwrap();
        let err = store.insert(&event_type("portrait")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_none() {
        let store = MemoryStore::default();
        assert!(store.update(&event_type("event")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_newest_first_and_filters_by_key() {
        let store = MemoryStore::default();
        let mut older = event_type("older");
        older.created_at = Utc::now() - Duration::days(1);
        store.insert(&older).await.unwrap();
        store.insert(&event_type("newer")).await.unwrap();

        let slugs: Vec<String> = store
            .list::<EventType>()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.slug)
            .collect();
        assert_eq!(slugs, vec!["newer", "older"]);

        let found = store
            .find_by::<EventType>("slug", Key::Text("older"))
            .await
            .unwrap();
        assert_eq!(found.map(|row| row.id), Some(older.id));
    }

    #[tokio::test]
    async fn seed_contains_admin() {
        let store = MemoryStore::default();
        seed_demo_data(&store).await.unwrap();
        let admin = store.get::<User>(DEMO_ADMIN_ID).await.unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(store.list::<EventType>().await.unwrap().len(), 3);
    }
}
