use std::{fs, path::Path};

use kube::api::DynamicObject;
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};
use serde::Deserialize;
use walkdir::WalkDir;

use super::{RenderContext, RenderError};

/// Renders every manifest template below `dir`, in lexical path order, into
/// Kubernetes objects. Files may hold several YAML documents, empty ones are
/// skipped.
pub fn render_dir(dir: &Path, context: &RenderContext) -> Result<Vec<DynamicObject>, RenderError> {
    if !dir.is_dir() {
        return Err(RenderError::MissingTemplateDir(dir.to_owned()));
    }

    let environment = create_environment();
    let values = Value::from_serialize(context.data());
    let mut objects = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| RenderError::Walk {
            path: dir.to_owned(),
            source,
        })?;

        if !entry.file_type().is_file() || !is_manifest(entry.path()) {
            continue;
        }

        let template = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        let source = fs::read_to_string(entry.path()).map_err(|source| RenderError::Io {
            path: entry.path().to_owned(),
            source,
        })?;
        let rendered = environment
            .render_named_str(&template, &source, &values)
            .map_err(|source| RenderError::Template {
                template: template.clone(),
                source,
            })?;

        objects.extend(parse_documents(&template, &rendered)?);
    }

    Ok(objects)
}

fn create_environment() -> Environment<'static> {
    let mut environment = Environment::new();
    environment.set_undefined_behavior(UndefinedBehavior::Strict);
    environment.set_auto_escape_callback(|_| AutoEscape::None);
    environment.set_keep_trailing_newline(true);

    environment
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("yaml" | "yml")
    )
}

fn parse_documents(template: &str, rendered: &str) -> Result<Vec<DynamicObject>, RenderError> {
    let mut objects = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(rendered).enumerate() {
        let manifest_error = |source: serde_yaml::Error| RenderError::Manifest {
            template: template.to_owned(),
            index,
            source,
        };

        let value = serde_yaml::Value::deserialize(document).map_err(manifest_error)?;
        if value.is_null() {
            continue;
        }

        objects.push(serde_yaml::from_value(value).map_err(manifest_error)?);
    }

    Ok(objects)
}
