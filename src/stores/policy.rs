//! Policy store: community policies and the global default configuration
//!
//! Read-mostly; administrative writes happen out of band.

use async_trait::async_trait;
use bson::doc;

use crate::db::schemas::{
    CommunityDoc, GlobalConfigDoc, COMMUNITY_COLLECTION, CONFIG_COLLECTION, GLOBAL_CONFIG_ID,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// Read access to community policies and global defaults
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetch one community's policy by community id
    async fn community(&self, community_id: i64) -> Result<Option<CommunityDoc>>;

    /// Fetch every community with distribution enabled
    async fn enabled_communities(&self) -> Result<Vec<CommunityDoc>>;

    /// Fetch the global default-configuration document
    async fn global_config(&self) -> Result<Option<GlobalConfigDoc>>;
}

/// MongoDB-backed policy store
pub struct MongoPolicyStore {
    communities: MongoCollection<CommunityDoc>,
    config: MongoCollection<GlobalConfigDoc>,
}

impl MongoPolicyStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            communities: client.collection(COMMUNITY_COLLECTION).await?,
            config: client.collection(CONFIG_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl PolicyStore for MongoPolicyStore {
    async fn community(&self, community_id: i64) -> Result<Option<CommunityDoc>> {
        self.communities
            .find_one(doc! { "server_id": community_id })
            .await
    }

    async fn enabled_communities(&self) -> Result<Vec<CommunityDoc>> {
        self.communities.find_many(doc! { "enabled": true }).await
    }

    async fn global_config(&self) -> Result<Option<GlobalConfigDoc>> {
        self.config.find_one(doc! { "_id": GLOBAL_CONFIG_ID }).await
    }
}
