use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub product: String,
    pub quantity: i32,
    #[serde(with = "iso_date::option")]
    pub delivery_date: Option<Date>,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub name: String,
    pub email: String,
    pub product: String,
    pub quantity: i32,
    pub delivery_date: Option<Date>,
    pub note: Option<String>,
}

pub async fn create(db: &PgPool, order: &NewOrder) -> anyhow::Result<Order> {
    let row = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (name, email, product, quantity, delivery_date, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, email, product, quantity, delivery_date, note, created_at
        "#,
    )
    .bind(&order.name)
    .bind(&order.email)
    .bind(&order.product)
    .bind(order.quantity)
    .bind(order.delivery_date)
    .bind(&order.note)
    .fetch_one(db)
    .await?;
    Ok(row)
}
