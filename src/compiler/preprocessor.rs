//! Include Preprocessor
//!
//! Expands `#include "path"` / `#include <path>` directives textually against
//! a fixed include universe (the pack's source map). No other directive is
//! interpreted; `#define`, `#ifdef` and friends pass through untouched for the
//! external compiler.
//!
//! Each expanded include is wrapped in marker comments:
//!
//! ```glsl
//! // BEGIN INCLUDE shaders/include/common.glsl
//! #define PI 3.14159
//! // END INCLUDE shaders/include/common.glsl
//! ```
//!
//! # Once-per-unit expansion
//!
//! Within one [`Preprocessor::preprocess`] call a path is expanded at most
//! once, no matter where in the include tree it is referenced again. Later
//! references become a `// ... [already included]` comment. This is not a
//! per-branch include guard: a sibling branch that includes the same file
//! also sees it skipped. Downstream compilation relies on every include's
//! defines appearing at most once per compiled unit.

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::errors::{Result, ShaderPackError};
use crate::pack::SourceMap;
use crate::settings::DEFAULT_MAX_INCLUDE_DEPTH;

/// Parses an include directive, returning the referenced path.
///
/// Accepts optional leading whitespace, `#`, optional whitespace, `include`,
/// at least one whitespace character, then a path opened by `"` or `<` and
/// closed by `"` or `>`. The path may not contain `"`, `'` or `>`.
#[must_use]
pub fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?;
    let rest = rest.trim_start().strip_prefix("include")?;

    let path_start = rest.trim_start();
    if path_start.len() == rest.len() {
        return None;
    }

    let body = path_start
        .strip_prefix('"')
        .or_else(|| path_start.strip_prefix('<'))?;

    let end = body.find(['"', '\'', '>'])?;
    if end == 0 || body[end..].starts_with('\'') {
        return None;
    }

    Some(&body[..end])
}

/// Directly referenced include paths of `source`, in order, without expanding.
#[must_use]
pub fn extract_includes(source: &str) -> Vec<&str> {
    source.lines().filter_map(parse_include_directive).collect()
}

/// Recursive include expander bound to one include universe.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor<'a> {
    includes: &'a SourceMap,
    max_depth: usize,
}

impl<'a> Preprocessor<'a> {
    #[must_use]
    pub fn new(includes: &'a SourceMap) -> Self {
        Self {
            includes,
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expands every include of `source`. `origin` names the source in errors.
    ///
    /// Line endings are normalized to `\n` and every output line ends with one.
    pub fn preprocess(&self, source: &str, origin: &str) -> Result<String> {
        let mut expanded = FxHashSet::default();
        let mut out = String::with_capacity(source.len());
        self.expand(source, origin, 0, &mut expanded, &mut out)?;
        Ok(out)
    }

    fn expand(
        &self,
        source: &str,
        current: &str,
        depth: usize,
        expanded: &mut FxHashSet<String>,
        out: &mut String,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(ShaderPackError::IncludeDepthExceeded {
                path: current.to_string(),
                max_depth: self.max_depth,
            });
        }

        for (index, line) in source.lines().enumerate() {
            let Some(path) = parse_include_directive(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            if expanded.contains(path) {
                warn!("Skipping already included file: {path} (referenced in {current})");
                out.push_str("// ");
                out.push_str(line);
                out.push_str(" [already included]\n");
                continue;
            }

            let Some(content) = self.includes.get(path) else {
                return Err(ShaderPackError::IncludeNotFound {
                    path: path.to_string(),
                    origin: current.to_string(),
                    line: index + 1,
                });
            };

            expanded.insert(path.to_string());

            out.push_str("// BEGIN INCLUDE ");
            out.push_str(path);
            out.push('\n');

            self.expand(content, path, depth + 1, expanded, out)?;
            if !out.ends_with('\n') {
                out.push('\n');
            }

            out.push_str("// END INCLUDE ");
            out.push_str(path);
            out.push('\n');

            debug!("Included: {current} -> {path}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe(entries: &[(&str, &str)]) -> SourceMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_directive_forms() {
        assert_eq!(parse_include_directive("#include \"a.glsl\""), Some("a.glsl"));
        assert_eq!(parse_include_directive("#include <a.glsl>"), Some("a.glsl"));
        assert_eq!(parse_include_directive("   #  include   \"x/y.glsl\" // c"), Some("x/y.glsl"));
        assert_eq!(parse_include_directive("\t#include \"a.glsl>"), Some("a.glsl"));

        assert_eq!(parse_include_directive("#include\"a.glsl\""), None);
        assert_eq!(parse_include_directive("#include \"\""), None);
        assert_eq!(parse_include_directive("#include \"it's.glsl\""), None);
        assert_eq!(parse_include_directive("// #include \"a.glsl\""), None);
        assert_eq!(parse_include_directive("#define INCLUDE 1"), None);
        assert_eq!(parse_include_directive("#include a.glsl"), None);
    }

    #[test]
    fn test_source_without_includes_is_unchanged() {
        let includes = SourceMap::default();
        let pre = Preprocessor::new(&includes);

        let source = "#version 450\nvoid main() {\n    gl_Position = vec4(0.0);\n}\n";
        assert_eq!(pre.preprocess(source, "a.vsh").unwrap(), source);

        // Missing trailing newline and CRLF endings are normalized.
        assert_eq!(pre.preprocess("a\r\nb", "a.vsh").unwrap(), "a\nb\n");
    }

    #[test]
    fn test_include_is_wrapped_in_markers() {
        let includes = universe(&[("common.glsl", "#define PI 3.14159")]);
        let out = Preprocessor::new(&includes)
            .preprocess("#version 450\n#include \"common.glsl\"\nvoid main() {}\n", "t.vsh")
            .unwrap();

        assert_eq!(
            out,
            "#version 450\n\
             // BEGIN INCLUDE common.glsl\n\
             #define PI 3.14159\n\
             // END INCLUDE common.glsl\n\
             void main() {}\n"
        );
    }

    #[test]
    fn test_nested_includes() {
        let includes = universe(&[
            ("common.glsl", "#define PI 3.14159\n"),
            ("lighting.glsl", "#include \"common.glsl\"\nfloat light() { return PI; }\n"),
        ]);
        let out = Preprocessor::new(&includes)
            .preprocess("#include <lighting.glsl>\n", "t.fsh")
            .unwrap();

        let begin_lighting = out.find("// BEGIN INCLUDE lighting.glsl").unwrap();
        let begin_common = out.find("// BEGIN INCLUDE common.glsl").unwrap();
        let end_common = out.find("// END INCLUDE common.glsl").unwrap();
        let end_lighting = out.find("// END INCLUDE lighting.glsl").unwrap();
        assert!(begin_lighting < begin_common);
        assert!(begin_common < end_common);
        assert!(end_common < end_lighting);
    }

    #[test]
    fn test_missing_include_reports_origin_and_line() {
        let includes = SourceMap::default();
        let err = Preprocessor::new(&includes)
            .preprocess("#version 450\n\n#include \"missing.glsl\"\n", "t.vsh")
            .unwrap_err();

        match err {
            ShaderPackError::IncludeNotFound { path, origin, line } => {
                assert_eq!(path, "missing.glsl");
                assert_eq!(origin, "t.vsh");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_second_reference_anywhere_is_skipped() {
        let includes = universe(&[
            ("common.glsl", "#define PI 3.14159\n"),
            ("a.glsl", "#include \"common.glsl\"\n"),
            ("b.glsl", "#include \"common.glsl\"\n"),
        ]);
        let out = Preprocessor::new(&includes)
            .preprocess("#include \"a.glsl\"\n#include \"b.glsl\"\n", "t.vsh")
            .unwrap();

        assert_eq!(out.matches("#define PI").count(), 1);
        assert_eq!(out.matches("// BEGIN INCLUDE common.glsl").count(), 1);
        assert!(out.contains("// #include \"common.glsl\" [already included]"));
    }

    #[test]
    fn test_expansion_set_resets_between_calls() {
        let includes = universe(&[("common.glsl", "#define PI 3.14159\n")]);
        let pre = Preprocessor::new(&includes);
        let first = pre.preprocess("#include \"common.glsl\"\n", "a.vsh").unwrap();
        let second = pre.preprocess("#include \"common.glsl\"\n", "a.fsh").unwrap();
        assert_eq!(first, second);
        assert!(second.contains("#define PI"));
    }

    #[test]
    fn test_cycle_is_not_an_error() {
        let includes = universe(&[
            ("a.glsl", "#include \"b.glsl\"\n"),
            ("b.glsl", "#include \"a.glsl\"\n"),
        ]);
        let out = Preprocessor::new(&includes)
            .preprocess("#include \"b.glsl\"\n", "a.glsl")
            .unwrap();
        assert!(out.contains("[already included]"));
    }

    fn chain(len: usize) -> SourceMap {
        (0..len)
            .map(|i| {
                let body = if i + 1 < len {
                    format!("#include \"inc{}.glsl\"\n", i + 1)
                } else {
                    "float leaf;\n".to_string()
                };
                (format!("inc{i}.glsl"), body)
            })
            .collect()
    }

    #[test]
    fn test_depth_limit_allows_exactly_max_levels() {
        let includes = chain(32);
        let out = Preprocessor::new(&includes)
            .preprocess("#include \"inc0.glsl\"\n", "root.vsh")
            .unwrap();
        assert!(out.contains("float leaf;"));
    }

    #[test]
    fn test_depth_limit_exceeded() {
        let includes = chain(33);
        let err = Preprocessor::new(&includes)
            .preprocess("#include \"inc0.glsl\"\n", "root.vsh")
            .unwrap_err();
        match err {
            ShaderPackError::IncludeDepthExceeded { path, max_depth } => {
                assert_eq!(path, "inc32.glsl");
                assert_eq!(max_depth, 32);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_depth_limit() {
        let includes = chain(3);
        let result = Preprocessor::new(&includes)
            .with_max_depth(2)
            .preprocess("#include \"inc0.glsl\"\n", "root.vsh");
        assert!(matches!(
            result,
            Err(ShaderPackError::IncludeDepthExceeded { .. })
        ));
    }

    #[test]
    fn test_extract_includes_does_not_expand() {
        let source = "#include \"a.glsl\"\nvoid main() {}\n  #include <b/c.glsl>\n#include \"a.glsl\"\n";
        assert_eq!(extract_includes(source), vec!["a.glsl", "b/c.glsl", "a.glsl"]);
    }
}
