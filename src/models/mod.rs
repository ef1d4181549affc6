pub mod event;
pub mod objection;
pub mod project;
pub mod score;
pub mod task;
pub mod template;
pub mod user;

pub use event::*;
pub use objection::*;
pub use project::*;
pub use score::*;
pub use task::*;
pub use template::*;
pub use user::*;
