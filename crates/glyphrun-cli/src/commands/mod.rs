pub mod elements;
pub mod info;
pub mod shape;
