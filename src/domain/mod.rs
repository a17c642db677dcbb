pub mod ai;
pub mod barks;
pub mod entity;
pub mod grid;
pub mod maze;
pub mod physics;
pub mod rules;
