//! Primitives used by both compiler stages.

pub mod ids;
pub mod path;
pub mod placeholder;

pub use ids::{generate_id, hash_trigger_instance};
pub use path::{get_path, get_path_or, set_path, validate_required_fields};
pub use placeholder::{apply_answers, render_placeholder, unresolved_placeholders};
