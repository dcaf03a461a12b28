// tests/property/main.rs

mod compiler;
mod store;
