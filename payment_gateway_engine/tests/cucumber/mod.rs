mod setups;
mod steps;
mod supervision_world;

pub use supervision_world::SupervisionWorld;
