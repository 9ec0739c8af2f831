use sqlx::PgPool;
use uuid::Uuid;

pub async fn record_preference(
    db: &PgPool,
    user_id: Uuid,
    preference_id: &str,
    init_point: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payment_preferences (user_id, preference_id, init_point)
        VALUES ($1, $2, $3)
        ON CONFLICT (preference_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(preference_id)
    .bind(init_point)
    .execute(db)
    .await?;
    Ok(())
}
