use std::sync::Arc;

use lectern_service::{LecternService, PgQdrantStore};
use lectern_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LecternService>,
}
impl AppState {
	pub async fn new(config: lectern_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let store = PgQdrantStore::new(db, qdrant);
		let service = LecternService::new(config, Arc::new(store));

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: LecternService) -> Self {
		Self { service: Arc::new(service) }
	}
}
