pub mod item;
pub mod loaders;

pub use item::{BatchResult, FailureReason, Item, RetrievalFailure, RetrievalOutcome};
pub use loaders::{load_items, load_items_from_reader};
