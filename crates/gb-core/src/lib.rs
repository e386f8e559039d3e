pub mod bridge;
pub mod error;
pub mod game;
pub mod types;

pub use bridge::*;
pub use error::GameBoxError;
pub use game::*;
pub use types::*;
