pub mod model;
pub mod vote;
