//! Application state shared across handlers

use dochub_chat::{ChatEngine, ProviderRegistry};
use dochub_common::config::AppConfig;
use dochub_common::db::{DbPool, Repository};
use dochub_common::embeddings::create_embedder;
use dochub_common::errors::Result;
use dochub_ingestion::chunker::ChunkingConfig;
use dochub_ingestion::{DocumentPipeline, GithubClient, SyncCollector, SyncRegistry};
use dochub_search::SearchService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repository: Repository,
    pub registry: SyncRegistry,
    pub collector: Arc<SyncCollector>,
    pub search: SearchService,
    pub chat: Arc<ChatEngine>,
}

impl AppState {
    /// Wire up the full component graph from configuration
    pub fn new(config: Arc<AppConfig>, db: DbPool) -> Result<Self> {
        let repository = Repository::new(db.clone());
        let embedder = create_embedder(&config.embedding)?;

        let github = GithubClient::new(&config.github);
        let registry = SyncRegistry::new();
        let chunking = ChunkingConfig {
            max_chunk_size: config.sync.max_chunk_size,
            min_chunk_size: config.sync.min_chunk_size,
        };
        let pipeline = DocumentPipeline::new(repository.clone(), embedder.clone(), chunking);
        let collector = Arc::new(SyncCollector::new(
            repository.clone(),
            github,
            pipeline,
            registry.clone(),
            &config.sync,
        ));

        let search = SearchService::new(repository.clone(), embedder);

        let providers = ProviderRegistry::from_config(&config.chat);
        let chat = Arc::new(ChatEngine::new(
            repository.clone(),
            search.clone(),
            providers,
            config.chat.clone(),
        ));

        Ok(Self {
            config,
            db,
            repository,
            registry,
            collector,
            search,
            chat,
        })
    }
}
