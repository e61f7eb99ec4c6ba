pub mod contexts;
pub mod data;
pub mod model;
pub mod registries;
pub mod settings;
