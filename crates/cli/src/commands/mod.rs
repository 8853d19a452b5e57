pub mod agent;
pub mod slash;
