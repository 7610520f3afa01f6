//! Entity storage: tags, the vertex/line arena, and its shared handle.

pub mod shared;
pub mod store;
pub mod tags;

pub use shared::{ChangeListener, SharedStore};
pub use store::{Line, LineStore, Vertex};
pub use tags::Tags;
