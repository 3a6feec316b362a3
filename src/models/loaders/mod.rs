pub mod csv_loader;

pub use csv_loader::{load_items, load_items_from_reader};
