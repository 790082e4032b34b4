pub mod lifecycle;
pub mod plan;
