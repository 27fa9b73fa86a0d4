pub mod demo;
pub mod dump;
