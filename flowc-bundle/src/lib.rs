pub mod loader;
pub mod parser;

pub use loader::{list_entries, load_bundle, LoadedBundle, MAX_BUNDLE_BYTES};
pub use parser::ParserRegistry;
