pub mod item_ctx;
pub mod retrieval_flow;

pub use item_ctx::ItemCtx;
pub use retrieval_flow::{retrieve, RetrievalFlow, RetrievalSettings};
