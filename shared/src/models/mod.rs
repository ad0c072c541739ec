//! Domain models for apparel production, stock and sales

mod consignment;
mod location;
mod movement;
mod production;
mod sale;
mod stock;

pub use consignment::*;
pub use location::*;
pub use movement::*;
pub use production::*;
pub use sale::*;
pub use stock::*;
