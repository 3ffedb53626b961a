pub mod decision;
pub mod evaluate;
pub mod main;
pub mod score;
pub mod shared;
