//! The engine facade tying ingestion, indexing, retrieval, and generation
//! together behind one shared handle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::Settings;
use crate::embedding::{EmbeddingProvider, HttpEmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::{KeywordIndex, KeywordIndexStats, VectorIndex, VectorIndexStats};
use crate::ingestion::{DocumentLoader, TextChunker};
use crate::llm::{provider_from_settings, AnswerGenerator, GenerationProvider};
use crate::search::{FusionMode, HybridSearch};
use crate::types::{Chunk, Document, DocumentInfo, IngestReport, QueryRequest, QueryResponse};

const MIN_TOP_K: usize = 1;
const MAX_TOP_K: usize = 20;

const VECTORS_FILE: &str = "vectors.json";
const CHUNKS_FILE: &str = "chunks.json";

/// Both indexes over one generation of the corpus, replaced as a unit.
struct IndexState {
    vector: VectorIndex,
    keyword: KeywordIndex,
}

/// Combined index statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub vector: VectorIndexStats,
    pub keyword: KeywordIndexStats,
}

/// The retrieval-and-generation engine.
///
/// Holds both indexes behind one read-write lock: queries take shared read
/// access, rebuilds construct the replacement state off-lock and swap it in
/// under write access. A query racing a rebuild therefore sees either the
/// complete old corpus or the complete new one, never a mix.
pub struct RagEngine {
    settings: Settings,
    chunker: TextChunker,
    loader: DocumentLoader,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
    fusion: HybridSearch,
    fusion_mode: FusionMode,
    state: RwLock<IndexState>,
    /// Serializes mutating operations (ingest, clear, restore) with each
    /// other. Snapshot, rebuild, and swap must happen without another
    /// rebuild interleaving, or the later swap would discard the earlier
    /// one's chunks; readers still only contend on the state lock.
    rebuild_lock: Mutex<()>,
}

impl RagEngine {
    /// Builds an engine over explicit embedding and generation providers.
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        provider: Option<Box<dyn GenerationProvider>>,
    ) -> Self {
        let chunker = TextChunker::new(settings.chunk_size, settings.chunk_overlap);
        let generator =
            AnswerGenerator::new(provider, settings.llm_temperature, settings.llm_max_tokens);
        let fusion = HybridSearch::new(
            settings.vector_weight,
            settings.keyword_weight,
            settings.vector_top_k,
            settings.keyword_top_k,
        );
        let state = IndexState {
            vector: VectorIndex::new(Arc::clone(&embedder)),
            keyword: KeywordIndex::new(),
        };
        Self {
            settings,
            chunker,
            loader: DocumentLoader::new(),
            embedder,
            generator,
            fusion,
            fusion_mode: FusionMode::ReciprocalRank,
            state: RwLock::new(state),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Builds an engine from settings alone, wiring the HTTP embedding
    /// provider and whichever generation provider is configured.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbeddingProvider::new(
            settings.embedding_api_base.clone(),
            settings.embedding_api_key.clone(),
            settings.embedding_model.clone(),
            settings.embedding_dimension,
            settings.embedding_batch_size,
            settings.request_timeout,
        )?);
        let provider = provider_from_settings(&settings)?;
        Ok(Self::new(settings, embedder, provider))
    }

    #[must_use]
    pub fn with_fusion_mode(mut self, mode: FusionMode) -> Self {
        self.fusion_mode = mode;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Chunks the given documents, adds them to the corpus, and rebuilds
    /// both indexes. The rebuilt state is constructed off-lock and swapped
    /// in atomically, then persisted.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport> {
        let new_chunks = self.chunker.process(&documents);
        info!(
            documents = documents.len(),
            chunks = new_chunks.len(),
            "ingesting documents"
        );

        let _rebuild = self.rebuild_lock.lock().await;
        let mut all_chunks = {
            let state = self.state.read().await;
            state.vector.chunks().to_vec()
        };
        let created = new_chunks.len();
        all_chunks.extend(new_chunks);

        self.rebuild(all_chunks).await?;
        self.save_indexes().await?;

        Ok(IngestReport {
            documents_processed: documents.len(),
            chunks_created: created,
        })
    }

    /// Loads every supported file under `path` and ingests it.
    pub async fn ingest_dir(&self, path: &Path) -> Result<IngestReport> {
        let documents = self.loader.load_dir(path).await?;
        self.ingest(documents).await
    }

    /// Loads a single supported file and ingests it.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let document = self.loader.load_file(path).await?;
        self.ingest(vec![document]).await
    }

    async fn rebuild(&self, chunks: Vec<Chunk>) -> Result<()> {
        let mut vector = VectorIndex::new(Arc::clone(&self.embedder));
        vector.build(chunks.clone()).await?;
        let mut keyword = KeywordIndex::new();
        keyword.build(chunks);

        let mut state = self.state.write().await;
        *state = IndexState { vector, keyword };
        Ok(())
    }

    /// Answers a query: hybrid retrieval over both indexes, then grounded
    /// generation over the fused context.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RagError::UnsupportedInput("query must not be empty".into()));
        }
        let top_k = request.top_k.unwrap_or(self.settings.hybrid_top_k);
        if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
            return Err(RagError::UnsupportedInput(format!(
                "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}, got {top_k}"
            )));
        }

        let started = Instant::now();
        let results = {
            let state = self.state.read().await;
            self.fusion
                .search(&state.vector, &state.keyword, query, top_k, self.fusion_mode)
                .await?
        };
        let retrieval_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let chunks: Vec<_> = results.into_iter().map(|result| result.chunk).collect();
        let generation_started = Instant::now();
        let generated = self
            .generator
            .generate(query, &chunks, request.use_citations)
            .await;
        let generation_time_ms = generation_started.elapsed().as_secs_f64() * 1000.0;

        info!(
            sources = generated.sources.len(),
            model = %generated.model_used,
            "query answered"
        );
        Ok(QueryResponse {
            query: query.to_string(),
            answer: generated.answer,
            sources: generated.sources,
            model_used: generated.model_used,
            retrieval_time_ms,
            generation_time_ms,
            total_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    /// Drops the entire corpus, in memory and on disk.
    pub async fn clear(&self) -> Result<()> {
        let _rebuild = self.rebuild_lock.lock().await;
        {
            let mut state = self.state.write().await;
            *state = IndexState {
                vector: VectorIndex::new(Arc::clone(&self.embedder)),
                keyword: KeywordIndex::new(),
            };
        }
        self.save_indexes().await?;
        info!("corpus cleared");
        Ok(())
    }

    fn vectors_path(&self) -> PathBuf {
        self.settings.index_dir.join(VECTORS_FILE)
    }

    fn chunks_path(&self) -> PathBuf {
        self.settings.index_dir.join(CHUNKS_FILE)
    }

    /// Persists the current index state to the configured directory.
    pub async fn save_indexes(&self) -> Result<()> {
        let state = self.state.read().await;
        state
            .vector
            .save(&self.vectors_path(), &self.chunks_path())
            .await
    }

    /// Restores previously saved indexes, rebuilding the keyword side from
    /// the persisted chunk sequence. Absent artifacts mean a fresh start
    /// and return `false`; corrupt artifacts fail the load.
    pub async fn load_indexes(&self) -> Result<bool> {
        let _rebuild = self.rebuild_lock.lock().await;
        let vectors_path = self.vectors_path();
        let chunks_path = self.chunks_path();
        if !vectors_path.exists() || !chunks_path.exists() {
            warn!(dir = %self.settings.index_dir.display(), "no saved indexes, starting fresh");
            return Ok(false);
        }

        let vector =
            VectorIndex::load(Arc::clone(&self.embedder), &vectors_path, &chunks_path).await?;
        let mut keyword = KeywordIndex::new();
        keyword.build(vector.chunks().to_vec());

        let mut state = self.state.write().await;
        *state = IndexState { vector, keyword };
        info!(chunks = state.vector.len(), "indexes restored");
        Ok(true)
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        EngineStats {
            vector: state.vector.stats(),
            keyword: state.keyword.stats(),
        }
    }

    /// Per-document summaries of the current corpus, sorted by source.
    pub async fn list_documents(&self) -> Vec<DocumentInfo> {
        let state = self.state.read().await;
        let mut by_source: HashMap<&str, DocumentInfo> = HashMap::new();
        for chunk in state.vector.chunks() {
            by_source
                .entry(chunk.metadata.source.as_str())
                .and_modify(|info| info.chunks += 1)
                .or_insert_with(|| DocumentInfo {
                    file_name: chunk.metadata.file_name.clone(),
                    file_type: chunk.metadata.file_type.clone(),
                    source: chunk.metadata.source.clone(),
                    loaded_at: chunk.metadata.loaded_at,
                    chunks: 1,
                });
        }
        let mut documents: Vec<DocumentInfo> = by_source.into_values().collect();
        documents.sort_by(|a, b| a.source.cmp(&b.source));
        documents
    }
}

static GLOBAL: once_cell::sync::OnceCell<Arc<RagEngine>> = once_cell::sync::OnceCell::new();

/// Installs the process-wide engine. Later calls return the engine that was
/// installed first.
pub fn init_global(engine: RagEngine) -> Arc<RagEngine> {
    GLOBAL.get_or_init(|| Arc::new(engine)).clone()
}

/// The process-wide engine, if one has been installed.
pub fn try_global() -> Option<Arc<RagEngine>> {
    GLOBAL.get().cloned()
}
