//! Colony View - frame composition for an isometric colony-simulation viewer

pub mod core;
pub mod renderer;
pub mod sim;
