//! Backend construction from resolved configuration

use lyricdesk_common::config::Backend;
use lyricdesk_common::db::init_database;
use lyricdesk_common::Result;
use std::sync::Arc;
use tracing::info;

use crate::catalog::{CatalogStore, RestCatalog, SqliteCatalog};
use crate::hosted::HostedClient;
use crate::identity::{IdentityAdmin, LocalIdentity, RestIdentityAdmin};

/// Catalog and identity provider for one backend
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogStore>,
    pub identity: Arc<dyn IdentityAdmin>,
}

/// Open the configured backend
pub async fn connect(backend: &Backend) -> Result<Backends> {
    match backend {
        Backend::Local { database_path } => {
            info!("Using local database: {}", database_path.display());
            let pool = init_database(database_path).await?;
            Ok(Backends {
                catalog: Arc::new(SqliteCatalog::new(pool.clone())),
                identity: Arc::new(LocalIdentity::new(pool)),
            })
        }
        Backend::Hosted { url, service_key } => {
            info!("Using hosted backend: {}", url);
            let client = HostedClient::new(url, service_key)?;
            Ok(Backends {
                catalog: Arc::new(RestCatalog::new(client.clone())),
                identity: Arc::new(RestIdentityAdmin::new(client)),
            })
        }
    }
}
