use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Extension of the documents mirrored under the document root.
pub const DOCUMENT_EXTENSION: &str = "md";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("remote name is empty")]
    Empty,
    #[error("remote name contains unsupported component: {0}")]
    UnsupportedComponent(String),
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == DOCUMENT_EXTENSION)
}

/// Name a document is created under when its header carries none.
pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn document_path_for(dir: &Path, name: &str) -> Result<PathBuf, PathError> {
    let name = single_component(name)?;
    Ok(dir.join(format!("{name}.{DOCUMENT_EXTENSION}")))
}

pub fn folder_path_for(dir: &Path, name: &str) -> Result<PathBuf, PathError> {
    Ok(dir.join(single_component(name)?))
}

// Remote names become one path component; anything that would leave `dir` is refused.
fn single_component(name: &str) -> Result<&str, PathError> {
    if name.is_empty() {
        return Err(PathError::Empty);
    }
    if name.contains(['/', '\\']) {
        return Err(PathError::UnsupportedComponent(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(PathError::UnsupportedComponent(name.to_string())),
    }
}
