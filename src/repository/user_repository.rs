use sqlx::{query, query_as, FromRow, Pool, Sqlite, SqliteConnection};

use crate::{
    error::PicksError,
    models::{types::UtcDateTime, User, UserId},
    repository::conversion::DBConvertible,
};

use super::conversion::{DBFromConversionError, DBToConversionError};

#[derive(Debug)]
pub struct UserRepository {
    pool: Pool<Sqlite>,
}

impl UserRepository {
    pub fn new(pool: Pool<Sqlite>) -> UserRepository {
        UserRepository { pool }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, PicksError> {
        let mut connection = self.pool.acquire().await?;
        fetch_users(&mut connection).await
    }

    /// Adds the participants that do not exist yet. Returns how many were added.
    pub async fn seed_users(
        &self,
        names: &[String],
        now: UtcDateTime,
    ) -> Result<u64, PicksError> {
        let mut transaction = self.pool.begin().await?;

        let created_at = now.to_db()?;
        let mut added = 0;
        for name in names.iter().map(|name| name.trim()).filter(|name| !name.is_empty()) {
            let result = query(
                r#"
                    INSERT INTO users (name, created_at)
                    VALUES ($1, $2)
                    ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(name)
            .bind(&created_at)
            .execute(&mut *transaction)
            .await?;

            added += result.rows_affected();
        }

        transaction.commit().await?;

        Ok(added)
    }
}

/// All participants in listing order, which is the order they were added in.
pub async fn fetch_users(connection: &mut SqliteConnection) -> Result<Vec<User>, PicksError> {
    let rows = query_as::<_, SqlUser>(r#"SELECT id, name, created_at FROM users ORDER BY id"#)
        .fetch_all(&mut *connection)
        .await?;

    Ok(rows
        .iter()
        .map(User::from_db)
        .collect::<Result<Vec<_>, _>>()?)
}

pub async fn fetch_user_by_name(
    connection: &mut SqliteConnection,
    name: &str,
) -> Result<Option<User>, PicksError> {
    let row = query_as::<_, SqlUser>(r#"SELECT id, name, created_at FROM users WHERE name = $1"#)
        .bind(name)
        .fetch_optional(&mut *connection)
        .await?;

    match row {
        Some(row) => Ok(Some(User::from_db(&row)?)),
        None => Ok(None),
    }
}

#[derive(Debug, FromRow)]
pub struct SqlUser {
    id: i64,
    name: String,
    created_at: String,
}

impl DBConvertible for User {
    type DBType = SqlUser;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlUser {
            id: self.id.to_db()?,
            name: self.name.clone(),
            created_at: self.created_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(User {
            id: UserId::from_db(&value.id)?,
            name: value.name.clone(),
            created_at: UtcDateTime::from_db(&value.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{fetch_user_by_name, UserRepository};
    use crate::{models::types::UtcDateTime, repository::test_pool};

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test(tokio::test)]
    async fn seeding_is_idempotent_and_keeps_order() {
        let users = UserRepository::new(test_pool().await);

        let added = users
            .seed_users(&names(&["John", "Jean", "Emily"]), UtcDateTime::now())
            .await
            .unwrap();
        assert_eq!(added, 3);

        let added = users
            .seed_users(&names(&["Emily", "Papa Jack", " ", "John"]), UtcDateTime::now())
            .await
            .unwrap();
        assert_eq!(added, 1);

        let listed: Vec<String> = users
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.name)
            .collect();
        assert_eq!(listed, names(&["John", "Jean", "Emily", "Papa Jack"]));
    }

    #[test(tokio::test)]
    async fn lookup_by_name_is_exact() {
        let pool = test_pool().await;
        UserRepository::new(pool.clone())
            .seed_users(&names(&["Coconut"]), UtcDateTime::now())
            .await
            .unwrap();

        let mut connection = pool.acquire().await.unwrap();
        assert!(fetch_user_by_name(&mut connection, "Coconut")
            .await
            .unwrap()
            .is_some());
        assert!(fetch_user_by_name(&mut connection, "coconut")
            .await
            .unwrap()
            .is_none());
    }
}
