use sqlx::{PgPool, postgres::PgPoolOptions};

pub async fn connect_pg(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "connected to appointment database");
    Ok(pool)
}
