pub mod asset;
pub mod cycle;
pub mod model;
