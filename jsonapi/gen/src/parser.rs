//! Path template parsing.
//!
//! Extracts parameter names from URL path templates that use `{param}` syntax.

/// Extracts parameter names from a path template.
///
/// ## Examples
///
/// ```
/// use jsonapi_gen::parser::extract_path_params;
///
/// assert_eq!(extract_path_params("/articles"), vec![] as Vec<&str>);
/// assert_eq!(extract_path_params("/articles/{id}"), vec!["id"]);
/// assert_eq!(
///     extract_path_params("/articles/{article_id}/comments/{comment_id}"),
///     vec!["article_id", "comment_id"]
/// );
/// ```
pub fn extract_path_params(path: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut pos = 0;

    for (idx, c) in path.char_indices() {
        if c == '{' {
            pos = idx + 1; // Start after '{'
        } else if c == '}' && pos > 0 {
            let param = &path[pos..idx];
            if !param.is_empty() {
                params.push(param);
            }
            pos = 0;
        }
    }

    params
}

/// Returns the template parameters of `path` that `declared` does not cover.
///
/// ## Examples
///
/// ```
/// use jsonapi_gen::parser::undeclared_path_params;
///
/// let missing = undeclared_path_params("/articles/{id}/comments/{cid}", &["id"]);
/// assert_eq!(missing, vec!["cid"]);
/// ```
pub fn undeclared_path_params<'a>(path: &'a str, declared: &[&str]) -> Vec<&'a str> {
    extract_path_params(path)
        .into_iter()
        .filter(|param| !declared.contains(param))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_no_params() {
        assert_eq!(extract_path_params("/articles"), Vec::<&str>::new());
        assert_eq!(extract_path_params("/v1/articles"), Vec::<&str>::new());
        assert_eq!(extract_path_params("/"), Vec::<&str>::new());
    }

    #[test]
    fn extract_single_param() {
        assert_eq!(extract_path_params("/articles/{id}"), vec!["id"]);
        assert_eq!(extract_path_params("/{id}"), vec!["id"]);
        assert_eq!(
            extract_path_params("/people/{person_id}/articles"),
            vec!["person_id"]
        );
    }

    #[test]
    fn extract_multiple_params() {
        assert_eq!(
            extract_path_params("/articles/{article_id}/comments/{comment_id}"),
            vec!["article_id", "comment_id"]
        );
    }

    #[test]
    fn extract_consecutive_params() {
        assert_eq!(extract_path_params("/{a}/{b}"), vec!["a", "b"]);
    }

    #[test]
    fn extract_ignores_empty_braces() {
        assert_eq!(extract_path_params("/articles/{}"), Vec::<&str>::new());
    }

    #[test]
    fn undeclared_all_declared() {
        assert!(undeclared_path_params("/articles/{id}", &["id", "include"]).is_empty());
    }

    #[test]
    fn undeclared_reports_in_template_order() {
        assert_eq!(
            undeclared_path_params("/{a}/{b}/{c}", &["b"]),
            vec!["a", "c"]
        );
    }
}
