//! SeaORM entity models
//!
//! Database entities for the DocHub backend

mod chunk;
mod conversation;
mod document;
mod message;
mod project;
mod source;

pub use project::{
    ActiveModel as ProjectActiveModel, Column as ProjectColumn, Entity as ProjectEntity,
    Model as Project,
};

pub use source::{
    ActiveModel as SourceActiveModel, Column as SourceColumn, Entity as SourceEntity,
    Model as Source,
};

pub use document::{
    ActiveModel as DocumentActiveModel, Column as DocumentColumn, Entity as DocumentEntity,
    FileType, Model as Document,
};

pub use chunk::{
    ActiveModel as ChunkActiveModel, Column as ChunkColumn, Entity as ChunkEntity, Model as Chunk,
};

pub use conversation::{
    ActiveModel as ConversationActiveModel, Column as ConversationColumn,
    Entity as ConversationEntity, Model as Conversation,
};

pub use message::{
    ActiveModel as MessageActiveModel, Column as MessageColumn, Entity as MessageEntity,
    MessageRole, Model as Message, SourceCitation,
};
