pub mod public;
pub mod protected;
