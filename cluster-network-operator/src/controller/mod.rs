pub mod network;
pub mod reconciler;
