//! Terminal UI shell over the conversation controller.

pub mod app;
pub mod composer;
pub mod transcript;

pub use app::run;
pub use composer::Composer;
pub use transcript::Transcript;
