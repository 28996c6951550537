pub mod index;
pub mod similarity;
pub mod store;

pub use index::{EmbeddingIndex, Embedder, VectorStore};
pub use store::{MemoryVectorStore, PgVectorStore};
