use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Cart row joined with its product, as needed at checkout.
#[derive(Debug, Clone, FromRow)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

pub async fn list(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<CartItem>> {
    sqlx::query_as::<_, CartItem>(
        r#"
        SELECT product_id, quantity, updated_at
        FROM cart_items
        WHERE user_id = $1
        ORDER BY updated_at, product_id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Replaces the whole cart in one transaction.
pub async fn replace(db: &PgPool, user_id: Uuid, lines: &[CartLine]) -> sqlx::Result<()> {
    let mut tx: Transaction<'_, Postgres> = db.begin().await?;

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity, updated_at)
            VALUES ($1, $2, $3, now())
            "#,
        )
        .bind(user_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub async fn clear(db: &PgPool, user_id: Uuid) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

pub async fn priced_lines(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<PricedLine>> {
    sqlx::query_as::<_, PricedLine>(
        r#"
        SELECT c.product_id, p.name, p.price, c.quantity
        FROM cart_items c
        JOIN products p ON p.id = c.product_id
        WHERE c.user_id = $1
        ORDER BY c.updated_at, c.product_id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
