use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::Result;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &lectern_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}
}
