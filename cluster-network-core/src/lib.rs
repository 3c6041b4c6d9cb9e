pub mod defaults;
pub mod helpers;
pub mod migration;
pub mod plugins;
pub mod render;
pub mod resources;
pub mod safety;
pub mod validation;

pub const FIELD_MANAGER: &str = "cluster-network-operator";
