use std::fmt::Display;

use cluster_network_core::{
    migration::MigrationError, render::RenderError, safety::SafetyError,
    validation::ValidationError,
};
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Rendered manifest '{}' is missing its apiVersion or kind!", .0)]
    MissingManifestType(String),
    #[error("Couldn't patch the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Network configuration is invalid! {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
    #[error("Network configuration change is unsafe! {}", join_messages(.0))]
    Safety(Vec<SafetyError>),
    #[error("Couldn't render the network! Reason: {}", .0)]
    Render(RenderError),
    #[error("Couldn't migrate egress policies! Reason: {}", .0)]
    Migration(MigrationError),
}

fn join_messages<T: Display>(errors: &[T]) -> String {
    errors.iter().join(" ")
}
