pub mod actor;
pub mod cnn;
pub mod critic;
pub mod mlp;

pub use actor::Actor;
pub use critic::Critic;

/// Hidden layer widths shared by the actor and both critic heads.
pub const HIDDEN: [i64; 2] = [256, 256];
