//! Path template parsing and normalization.
//!
//! Rules may be written in converter form (`/items/<int:item_id>`) or in
//! template form (`/items/{item_id}`). Everything downstream compares the
//! normalized template form produced by [`convert_path`].

/// One `/`-delimited piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text that must match exactly.
    Static(String),
    /// A named placeholder, optionally wrapped in literal text as in
    /// `v<int:version>` or `{name}.json`.
    Param {
        /// Placeholder name.
        name: String,
        /// Converter named in a `<conv:name>` rule, if any.
        converter: Option<String>,
        /// Literal text before the placeholder.
        prefix: String,
        /// Literal text after the placeholder.
        suffix: String,
    },
}

impl Segment {
    fn matches_rest(&self) -> bool {
        matches!(self, Self::Param { converter: Some(c), .. } if c == "path")
    }

    /// The placeholder value inside `piece`, once the literals are stripped.
    fn strip_literals<'p>(&self, piece: &'p str) -> Option<&'p str> {
        let Self::Param { prefix, suffix, .. } = self else {
            return None;
        };
        piece
            .strip_prefix(prefix.as_str())
            .and_then(|v| v.strip_suffix(suffix.as_str()))
            .filter(|v| !v.is_empty())
    }
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a rule in either `<conv:name>` or `{name}` form.
    #[must_use]
    pub fn parse(rule: &str) -> Self {
        let segments = split_segments(rule)
            .map(|raw| parse_segment(raw).unwrap_or_else(|| Segment::Static(raw.to_string())))
            .collect();
        Self {
            template: convert_path(rule),
            segments,
        }
    }

    /// The normalized `{name}` form of the template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// Match a concrete request path, returning captured placeholder values.
    ///
    /// Converters other than `path` are not enforced here; typing a captured
    /// value is the binder's job so that a mistyped segment surfaces as a
    /// validation error instead of a 404.
    #[must_use]
    pub fn capture<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let mut captured = Vec::new();
        let mut rest = path.strip_prefix('/').unwrap_or(path);

        for (idx, segment) in self.segments.iter().enumerate() {
            let is_last = idx + 1 == self.segments.len();
            if segment.matches_rest() && is_last {
                if let Segment::Param { name, .. } = segment {
                    captured.push((name.as_str(), segment.strip_literals(rest)?));
                }
                return Some(captured);
            }

            let (piece, tail) = match rest.find('/') {
                Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
                None => (rest, None),
            };

            match segment {
                Segment::Static(text) => {
                    if piece != text {
                        return None;
                    }
                }
                Segment::Param { name, .. } => {
                    captured.push((name.as_str(), segment.strip_literals(piece)?));
                }
            }

            match (tail, is_last) {
                (Some(tail), false) => rest = tail,
                (None, true) => return Some(captured),
                _ => return None,
            }
        }

        None
    }
}

fn split_segments(rule: &str) -> impl Iterator<Item = &str> {
    rule.strip_prefix('/').unwrap_or(rule).split('/')
}

fn parse_segment(raw: &str) -> Option<Segment> {
    let (open, close_char) = raw.char_indices().find_map(|(idx, c)| match c {
        '<' => Some((idx, '>')),
        '{' => Some((idx, '}')),
        _ => None,
    })?;
    let close = open + raw[open..].find(close_char)?;
    let inner = &raw[open + 1..close];
    if inner.is_empty() {
        return None;
    }
    let (converter, name) = match inner.split_once(':') {
        Some((conv, name)) if close_char == '>' => (Some(conv.trim().to_string()), name),
        Some((name, conv)) => (Some(conv.trim().to_string()), name),
        None => (None, inner),
    };
    Some(Segment::Param {
        name: name.trim().to_string(),
        converter,
        prefix: raw[..open].to_string(),
        suffix: raw[close + 1..].to_string(),
    })
}

/// The first segment of `rule` holding more than one placeholder, such as
/// `<int:major>.<int:minor>`. Such segments cannot be split unambiguously.
#[must_use]
pub fn crowded_segment(rule: &str) -> Option<&str> {
    split_segments(rule).find(|raw| raw.matches(['<', '{']).count() > 1)
}

/// Normalize a rule to template form.
///
/// `<int:item_id>` and `<item_id>` both become `{item_id}`. Text around a
/// placeholder inside a segment is kept, as are already-normalized segments.
///
/// ```
/// use sugar_router::convert_path;
///
/// assert_eq!(convert_path("/api/items/<int:id>/"), "/api/items/{id}/");
/// assert_eq!(convert_path("/files/<path:name>"), "/files/{name}");
/// ```
#[must_use]
pub fn convert_path(rule: &str) -> String {
    let mut out = String::with_capacity(rule.len());
    let mut rest = rule;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>').map(|c| open + c) else {
            break;
        };
        out.push_str(&rest[..open]);
        let inner = &rest[open + 1..close];
        let name = inner.rsplit_once(':').map_or(inner, |(_, name)| name);
        out.push('{');
        out.push_str(name.trim());
        out.push('}');
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Placeholder names of a rule, in order, without duplicates.
#[must_use]
pub fn path_param_names(rule: &str) -> Vec<String> {
    let template = convert_path(rule);
    let mut names: Vec<String> = Vec::new();
    let mut rest = template.as_str();
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        let inner = &rest[open + 1..close];
        let name = inner.split_once(':').map_or(inner, |(name, _)| name);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &rest[close + 1..];
    }
    names
}

/// Join a group prefix and a rule, handling slashes.
#[must_use]
pub fn combine_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => prefix.to_string(),
        (true, false) if path.starts_with('/') => path.to_string(),
        (true, false) => format!("/{path}"),
        (false, false) => {
            let path = path.trim_start_matches('/');
            let prefix = if prefix.starts_with('/') {
                prefix.to_string()
            } else {
                format!("/{prefix}")
            };
            format!("{prefix}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_convert_path_converters() {
        assert_eq!(convert_path("/items/<int:item_id>"), "/items/{item_id}");
        assert_eq!(convert_path("/items/<item_id>"), "/items/{item_id}");
        assert_eq!(
            convert_path("/u/<string:user>/p/<int:post>/"),
            "/u/{user}/p/{post}/"
        );
    }

    #[test]
    fn test_convert_path_keeps_template_form() {
        assert_eq!(convert_path("/items/{item_id}"), "/items/{item_id}");
        assert_eq!(convert_path("/"), "/");
        assert_eq!(convert_path(""), "");
    }

    #[test]
    fn test_convert_path_unclosed_placeholder() {
        assert_eq!(convert_path("/items/<id"), "/items/<id");
    }

    #[test]
    fn test_path_param_names() {
        assert_eq!(
            path_param_names("/a/<int:x>/b/{y}/<x>"),
            vec!["x".to_string(), "y".to_string()]
        );
        assert!(path_param_names("/static").is_empty());
    }

    #[test]
    fn test_template_capture() {
        let template = PathTemplate::parse("/items/<int:item_id>");
        assert_eq!(template.as_str(), "/items/{item_id}");
        assert_eq!(
            template.capture("/items/42"),
            Some(vec![("item_id", "42")])
        );
        assert_eq!(template.capture("/items/abc"), Some(vec![("item_id", "abc")]));
        assert_eq!(template.capture("/items/"), None);
        assert_eq!(template.capture("/items/1/extra"), None);
        assert_eq!(template.capture("/other/1"), None);
    }

    #[test]
    fn test_template_capture_root_and_trailing_slash() {
        let root = PathTemplate::parse("/");
        assert_eq!(root.capture("/"), Some(vec![]));
        assert_eq!(root.capture("/x"), None);

        let slashed = PathTemplate::parse("/items/");
        assert_eq!(slashed.capture("/items/"), Some(vec![]));
        assert_eq!(slashed.capture("/items"), None);
    }

    #[test]
    fn test_template_path_converter_takes_rest() {
        let template = PathTemplate::parse("/files/<path:name>");
        assert_eq!(
            template.capture("/files/a/b/c.txt"),
            Some(vec![("name", "a/b/c.txt")])
        );
        assert_eq!(template.capture("/files/"), None);
    }

    #[test]
    fn test_template_capture_with_literals() {
        let template = PathTemplate::parse("/api/v<int:version>/{name}.json");
        assert_eq!(template.as_str(), "/api/v{version}/{name}.json");
        assert_eq!(
            template.capture("/api/v2/report.json"),
            Some(vec![("version", "2"), ("name", "report")])
        );
        assert_eq!(template.capture("/api/2/report.json"), None);
        assert_eq!(template.capture("/api/v/report.json"), None);
        assert_eq!(template.capture("/api/v2/report.xml"), None);
        let names: Vec<_> = template.param_names().collect();
        assert_eq!(names, path_param_names("/api/v<int:version>/{name}.json"));
    }

    #[test]
    fn test_crowded_segment() {
        assert_eq!(crowded_segment("/v<int:major>.<int:minor>/x"), Some("v<int:major>.<int:minor>"));
        assert_eq!(crowded_segment("/{a}{b}"), Some("{a}{b}"));
        assert_eq!(crowded_segment("/v<int:id>/{name}.json"), None);
    }

    #[test]
    fn test_param_names_in_order() {
        let template = PathTemplate::parse("/{org}/repos/<repo>");
        let names: Vec<_> = template.param_names().collect();
        assert_eq!(names, vec!["org", "repo"]);
    }

    #[test]
    fn test_combine_paths() {
        assert_eq!(combine_paths("", ""), "/");
        assert_eq!(combine_paths("", "/users"), "/users");
        assert_eq!(combine_paths("", "users"), "/users");
        assert_eq!(combine_paths("/api", ""), "/api");
        assert_eq!(combine_paths("/api/", "/users"), "/api/users");
        assert_eq!(combine_paths("api", "users"), "/api/users");
        assert_eq!(combine_paths("/items", "/"), "/items/");
    }

    proptest! {
        #[test]
        fn prop_convert_path_is_idempotent(rule in "(/[a-z]{1,5}|/<[a-z]{1,4}:[a-z]{1,5}>|/<[a-z]{1,5}>){0,5}/?") {
            let once = convert_path(&rule);
            prop_assert_eq!(convert_path(&once), once.clone());
            prop_assert!(!once.contains('<'));
        }

        #[test]
        fn prop_convert_path_preserves_names(names in prop::collection::vec("[a-z]{1,6}", 0..4)) {
            let rule: String = names.iter().map(|n| format!("/<int:{n}>")).collect();
            let expected: String = names.iter().map(|n| format!("/{{{n}}}")).collect();
            prop_assert_eq!(convert_path(&rule), expected);
        }
    }
}
