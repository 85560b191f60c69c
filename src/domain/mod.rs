pub mod entity;
pub mod geometry;
pub mod grid;
pub mod tile;
