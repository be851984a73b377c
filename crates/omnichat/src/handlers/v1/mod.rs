mod completions;

pub use completions::{complete, list_providers};
