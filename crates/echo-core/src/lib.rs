pub mod constants;
pub mod cooldown;
pub mod echo;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod mic;
pub mod pulse;
pub mod scheduler;
pub mod services;

pub use constants::*;
pub use cooldown::*;
pub use echo::*;
pub use emitter::*;
pub use engine::*;
pub use error::*;
pub use mic::*;
pub use pulse::*;
pub use scheduler::*;
pub use services::*;
