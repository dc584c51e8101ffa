//! Expands a caller-supplied path expression into the concrete, ordered list of files `fill`
//! should walk.
//!
//! Local paths (no scheme, or an explicit `file://`) are glob-expanded and sorted lexicographically
//! so the same input always yields the same entry numbering. Anything else is assumed to be a
//! remote URL and passed through unchanged, in the order given.

use crate::errors::PlanError;

/// One or many path expressions, as accepted by [`crate::planner::fill::fill`].
pub enum PathSpec {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for PathSpec {
    fn from(value: &str) -> Self {
        PathSpec::One(value.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(value: String) -> Self {
        PathSpec::One(value)
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(value: Vec<String>) -> Self {
        PathSpec::Many(value)
    }
}

/// Splits off a leading `scheme://` prefix, if present. Not a general URL parser — just enough to
/// tell a local path (or glob) apart from a remote one, which is all `fill` needs.
fn scheme_of(path: &str) -> Option<&str> {
    let colon = path.find("://")?;
    let scheme = &path[..colon];
    if scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        Some(scheme)
    } else {
        None
    }
}

fn local_part(path: &str) -> &str {
    match path.find("://") {
        Some(colon) => &path[colon + 3..],
        None => path,
    }
}

fn explode(path: &str) -> Result<Vec<String>, PlanError> {
    match scheme_of(path) {
        None | Some("file") => {
            let mut matches: Vec<String> = glob::glob(local_part(path))
                .map_err(|e| PlanError::InternalInvariant(format!("invalid glob pattern {path:?}: {e}")))?
                .filter_map(Result::ok)
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            matches.sort();
            Ok(matches)
        }
        Some(_) => Ok(vec![path.to_string()]),
    }
}

/// Expands `spec` into the ordered list of concrete paths `fill` should walk.
pub fn enumerate_paths(spec: PathSpec) -> Result<Vec<String>, PlanError> {
    let inputs = match spec {
        PathSpec::One(p) => vec![p],
        PathSpec::Many(ps) => ps,
    };

    let mut out = Vec::new();
    for input in inputs {
        out.extend(explode(&input)?);
    }
    Ok(out)
}
