pub mod flow;
pub mod game;
pub mod odds;
pub mod play;
pub mod stats;
