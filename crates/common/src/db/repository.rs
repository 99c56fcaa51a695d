//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.
//!
//! pgvector values travel through raw SQL statements with `::vector` casts;
//! everything else goes through SeaORM entities.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A chunk ready for persistence, paired with its embedding
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub index: i32,
    pub content: String,
    pub embedding: Vec<f32>,
    pub anchor: Option<String>,
}

/// Result row from vector similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub anchor: Option<String>,
    pub similarity_score: f64,
    pub chunk_index: i32,
    pub total_chunks: i32,
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
}

/// Format an embedding as the pgvector text literal "[1.0,2.0,...]"
fn embedding_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Project Operations
    // ========================================================================

    /// Find project by ID
    pub async fn find_project_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        ProjectEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Source Operations
    // ========================================================================

    /// Find source by ID
    pub async fn find_source_by_id(&self, id: Uuid) -> Result<Option<Source>> {
        SourceEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Write the source timestamps once a sync has settled.
    ///
    /// Never called mid-flight; a sync that aborts leaves the previous
    /// timestamps untouched.
    pub async fn mark_source_synced(
        &self,
        source_id: Uuid,
        synced_at: chrono::DateTime<chrono::Utc>,
        upstream_change_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Source> {
        let mut source: SourceActiveModel = SourceEntity::find_by_id(source_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::SourceNotFound {
                id: source_id.to_string(),
            })?
            .into();

        source.last_synced_at = Set(Some(synced_at.into()));
        source.last_upstream_change_at = Set(Some(upstream_change_at.into()));
        source.updated_at = Set(chrono::Utc::now().into());

        source.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Find a document by its relative path within a source
    pub async fn find_document_by_path(
        &self,
        source_id: Uuid,
        file_path: &str,
    ) -> Result<Option<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::SourceId.eq(source_id))
            .filter(DocumentColumn::FilePath.eq(file_path))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Map of file_path -> fingerprint for every document of a source.
    ///
    /// Used by the sync collector to detect changed files without loading
    /// document bodies.
    pub async fn document_fingerprints(&self, source_id: Uuid) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = DocumentEntity::find()
            .select_only()
            .column(DocumentColumn::FilePath)
            .column(DocumentColumn::Fingerprint)
            .filter(DocumentColumn::SourceId.eq(source_id))
            .into_tuple()
            .all(self.read_conn())
            .await?;

        Ok(rows.into_iter().collect())
    }

    /// Create or update a document.
    ///
    /// Content, fingerprint and size always move together in one statement so
    /// readers never observe a document whose fingerprint disagrees with its
    /// content.
    pub async fn upsert_document(
        &self,
        source_id: Uuid,
        file_path: &str,
        file_type: FileType,
        content: String,
        fingerprint: String,
    ) -> Result<Document> {
        let now = chrono::Utc::now();
        let size = content.len() as i64;

        let existing = self.find_document_by_path(source_id, file_path).await?;

        match existing {
            Some(doc) => {
                let mut doc: DocumentActiveModel = doc.into();
                doc.content = Set(content);
                doc.fingerprint = Set(fingerprint);
                doc.size = Set(size);
                doc.file_type = Set(String::from(file_type));
                doc.updated_at = Set(now.into());
                doc.update(self.write_conn()).await.map_err(Into::into)
            }
            None => {
                let doc = DocumentActiveModel {
                    id: Set(Uuid::new_v4()),
                    source_id: Set(source_id),
                    file_path: Set(file_path.to_string()),
                    file_type: Set(String::from(file_type)),
                    content: Set(content),
                    fingerprint: Set(fingerprint),
                    size: Set(size),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                doc.insert(self.write_conn()).await.map_err(Into::into)
            }
        }
    }

    /// List all documents of a source
    pub async fn list_documents_by_source(&self, source_id: Uuid) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::SourceId.eq(source_id))
            .order_by_asc(DocumentColumn::FilePath)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Count documents of a source
    pub async fn count_documents_by_source(&self, source_id: Uuid) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        DocumentEntity::find()
            .filter(DocumentColumn::SourceId.eq(source_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Chunk Operations
    // ========================================================================

    /// Replace a document's entire chunk set in one transaction.
    ///
    /// Delete-then-insert as a single unit: queries never observe a document
    /// with a mixture of old and new chunks. Each caller gets its own
    /// transaction scope, so concurrent pipeline workers do not interleave.
    pub async fn replace_chunks(&self, document: &Document, chunks: Vec<NewChunk>) -> Result<usize> {
        let total = chunks.len() as i32;
        let file_name = document.file_name().to_string();

        let txn = self.write_conn().begin().await?;

        let delete = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM chunks WHERE document_id = $1",
            vec![document.id.into()],
        );
        txn.execute(delete).await?;

        let inserted = chunks.len();
        for chunk in chunks {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO chunks (
                    id, document_id, chunk_index, content, embedding, anchor,
                    total_chunks, file_path, file_name, file_type, created_at
                )
                VALUES ($1, $2, $3, $4, $5::vector, $6, $7, $8, $9, $10, NOW())
                "#,
                vec![
                    Uuid::new_v4().into(),
                    document.id.into(),
                    chunk.index.into(),
                    chunk.content.into(),
                    embedding_literal(&chunk.embedding).into(),
                    chunk.anchor.into(),
                    total.into(),
                    document.file_path.clone().into(),
                    file_name.clone().into(),
                    document.file_type.clone().into(),
                ],
            );
            txn.execute(stmt).await?;
        }

        txn.commit().await?;

        Ok(inserted)
    }

    /// Get chunks for a document, ordered by position
    pub async fn get_chunks_by_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        ChunkEntity::find()
            .filter(ChunkColumn::DocumentId.eq(document_id))
            .order_by_asc(ChunkColumn::ChunkIndex)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Vector similarity search scoped to a project.
    ///
    /// Candidates are restricted to chunks whose owning document belongs to
    /// the project before ranking; ordering is by ascending cosine distance
    /// with chunk position as the tiebreak.
    pub async fn vector_search(
        &self,
        project_id: Uuid,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                c.id as chunk_id,
                c.document_id,
                c.content,
                c.anchor,
                c.chunk_index,
                c.total_chunks,
                c.file_path,
                c.file_name,
                c.file_type,
                1 - (c.embedding <=> $1::vector) as score
            FROM chunks c
            JOIN documents d ON c.document_id = d.id
            JOIN sources s ON d.source_id = s.id
            WHERE c.embedding IS NOT NULL
              AND s.project_id = $2
            ORDER BY c.embedding <=> $1::vector, c.chunk_index
            LIMIT $3
            "#,
            vec![
                embedding_literal(embedding).into(),
                project_id.into(),
                (limit as i32).into(),
            ],
        );

        let results = self
            .read_conn()
            .query_all(stmt)
            .await?
            .into_iter()
            .filter_map(|row| {
                Some(RetrievedChunk {
                    chunk_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    document_id: row.try_get_by_index::<Uuid>(1).ok()?,
                    content: row.try_get_by_index::<String>(2).ok()?,
                    anchor: row.try_get_by_index::<Option<String>>(3).ok()?,
                    chunk_index: row.try_get_by_index::<i32>(4).ok()?,
                    total_chunks: row.try_get_by_index::<i32>(5).ok()?,
                    file_path: row.try_get_by_index::<String>(6).ok()?,
                    file_name: row.try_get_by_index::<String>(7).ok()?,
                    file_type: row.try_get_by_index::<String>(8).ok()?,
                    similarity_score: row
                        .try_get_by_index::<f64>(9)
                        .ok()?
                        .clamp(0.0, 1.0),
                })
            })
            .collect();

        Ok(results)
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Create a conversation
    pub async fn create_conversation(
        &self,
        project_id: Uuid,
        provider: &str,
        title: Option<String>,
    ) -> Result<Conversation> {
        let now = chrono::Utc::now();

        let conversation = ConversationActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            provider: Set(provider.to_string()),
            title: Set(title),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        conversation
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Find conversation by ID
    pub async fn find_conversation_by_id(&self, id: Uuid) -> Result<Option<Conversation>> {
        ConversationEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List the most recent conversations of a project
    pub async fn list_conversations_by_project(
        &self,
        project_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Conversation>> {
        ConversationEntity::find()
            .filter(ConversationColumn::ProjectId.eq(project_id))
            .order_by_desc(ConversationColumn::UpdatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Set the conversation title if it is still unset
    pub async fn set_conversation_title(&self, id: Uuid, title: &str) -> Result<Conversation> {
        let conversation = ConversationEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: id.to_string() })?;

        if conversation.title.is_some() {
            return Ok(conversation);
        }

        let mut conversation: ConversationActiveModel = conversation.into();
        conversation.title = Set(Some(title.to_string()));
        conversation.updated_at = Set(chrono::Utc::now().into());
        conversation
            .update(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Bump the conversation's updated_at
    pub async fn touch_conversation(&self, id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE conversations SET updated_at = NOW() WHERE id = $1",
            vec![id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Append a message to a conversation
    pub async fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        sources: Option<Vec<SourceCitation>>,
    ) -> Result<Message> {
        let sources_json = match sources {
            Some(list) => Some(serde_json::to_value(list)?),
            None => None,
        };

        let message = MessageActiveModel {
            id: Set(Uuid::new_v4()),
            conversation_id: Set(conversation_id),
            role: Set(String::from(role)),
            content: Set(content.to_string()),
            sources: Set(sources_json),
            created_at: Set(chrono::Utc::now().into()),
        };

        message.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// List a conversation's messages in chronological order
    pub async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        MessageEntity::find()
            .filter(MessageColumn::ConversationId.eq(conversation_id))
            .order_by_asc(MessageColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_literal() {
        assert_eq!(embedding_literal(&[1.0, 2.5, -0.5]), "[1,2.5,-0.5]");
        assert_eq!(embedding_literal(&[]), "[]");
    }
}
