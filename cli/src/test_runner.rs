use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use pyblocks::block::kind::KindSpec;
use pyblocks::markup;
use pyblocks::render::{Renderer, svg};
use pyblocks::{Catalog, EditorSession};

use crate::block_span;
use crate::config::register_all;

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Extra block kinds registered on top of the built-in Python kinds.
    #[serde(default, rename = "kind")]
    pub kinds: Vec<KindSpec>,

    /// Expected generated Python (trimmed comparison).
    #[serde(default)]
    pub expect_python: Option<String>,

    /// Expected admissible sets, keyed by the blocks' `id` attribute and written the way
    /// `pyblocks types` prints them.
    #[serde(default)]
    pub expect_types: BTreeMap<String, String>,

    /// Substrings the rendered SVG document must contain.
    #[serde(default)]
    pub expect_svg: Vec<String>,

    /// Expected generation error. The error's Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected load error. Some load error's message must contain this substring.
    #[serde(default)]
    pub expect_load_error: Option<String>,

    /// Expected warnings: markup warnings, type advisories and generation warnings, in
    /// that order. If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Parse a `.test.xml` file into its TOML config and workspace markup.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

/// A warning produced anywhere between loading and generating.
struct Reported {
    message: String,
    span: Option<Range<usize>>,
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Ok(content) => match parse_test_file(&content) {
            Ok((config, source)) => (config.description.clone(), check(config, source)),
            Err(e) => (None, Err(format!("frontmatter error: {}", e))),
        },
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Load, generate and render one workspace against its expectations.
fn check(config: TestConfig, source: &str) -> Result<(), String> {
    let mut catalog = Catalog::python();
    register_all(&mut catalog, config.kinds).map_err(|e| format!("bad custom kind: {}", e))?;
    let mut session = EditorSession::new(catalog);

    // 1. Load
    let loaded = match (markup::load(source, 0, &mut session), &config.expect_load_error) {
        (Err(errors), Some(expected)) => {
            return if errors.iter().any(|e| e.message.contains(expected.as_str())) {
                Ok(())
            } else {
                let msgs: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
                Err(format!(
                    "expected load error containing \"{}\", got: {}",
                    expected,
                    msgs.join("; ")
                ))
            };
        }
        (Err(errors), None) => {
            let msgs: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            return Err(format!("unexpected load error: {}", msgs.join("; ")));
        }
        (Ok(_), Some(expected)) => {
            return Err(format!(
                "expected load error containing \"{}\", but loading succeeded",
                expected
            ));
        }
        (Ok(loaded), None) => loaded,
    };

    let mut warnings: Vec<Reported> = loaded
        .warnings
        .iter()
        .map(|w| Reported {
            message: w.message.clone(),
            span: Some(w.span.clone()),
        })
        .collect();
    warnings.extend(session.advisories().iter().map(|a| Reported {
        message: a.to_string(),
        span: block_span(&loaded, Some(a.block())),
    }));

    // 2. Types
    for (name, expected) in &config.expect_types {
        let Some(id) = loaded.names.get(name) else {
            return Err(format!("no block with id \"{}\"", name));
        };
        let actual = session
            .block(*id)
            .map(|b| b.type_vecs.to_string())
            .unwrap_or_default();
        if actual != expected.trim() {
            return Err(format!(
                "types of \"{}\" mismatch\n  expected: {}\n  actual:   {}",
                name,
                expected.trim(),
                actual
            ));
        }
    }

    // 3. Generate
    match (pygen::generate(&session), &config.expect_error) {
        (Err(e), Some(expected)) => {
            let err_str = e.to_string();
            if !err_str.contains(expected.as_str()) {
                return Err(format!(
                    "expected error containing \"{}\", got: {}",
                    expected, err_str
                ));
            }
        }
        (Err(e), None) => return Err(format!("unexpected generation error: {}", e)),
        (Ok(_), Some(expected)) => {
            return Err(format!(
                "expected error containing \"{}\", but generation succeeded",
                expected
            ));
        }
        (Ok(output), None) => {
            if let Some(expected) = &config.expect_python {
                let actual = output.code.trim();
                if actual != expected.trim() {
                    return Err(format!(
                        "python mismatch\n  expected:\n{}\n  actual:\n{}",
                        indent_block(expected.trim()),
                        indent_block(actual)
                    ));
                }
            }
            warnings.extend(output.warnings.iter().map(|w| Reported {
                message: w.to_string(),
                span: block_span(&loaded, w.block),
            }));
        }
    }

    // 4. Render
    if !config.expect_svg.is_empty() {
        let mut renderer: Renderer = Renderer::default();
        renderer.render_all(&mut session);
        let document = svg::write_document(&session, &renderer);
        for expected in &config.expect_svg {
            if !document.contains(expected.as_str()) {
                return Err(format!("rendered SVG does not contain \"{}\"", expected));
            }
        }
    }

    // 5. Warnings
    if let Some(expected_warnings) = &config.expect_warnings {
        if let Some(reason) = check_warnings(source, &warnings, expected_warnings) {
            return Err(reason);
        }
    }

    Ok(())
}

fn indent_block(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(source: &str, actual: &[Reported], expected: &[ExpectedWarning]) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|w| format!("  - {}", w.message)).collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected.iter()).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            if let Some(span) = &actual.span {
                let actual_line = byte_offset_to_line(source, span.start);
                if actual_line != expected_line {
                    return Some(format!(
                        "warning[{}]: expected on line {}, but span is on line {}",
                        i, expected_line, actual_line
                    ));
                }
            } else {
                return Some(format!(
                    "warning[{}]: expected on line {}, but warning has no span",
                    i, expected_line
                ));
            }
        }
    }

    None
}

const SUFFIX: &str = ".test.xml";

/// Test files under `root` grouped by category, the subfolder path relative to `root`.
/// Files directly in `root` have the empty category.
fn discover(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|e| e.path()) {
            if path.is_dir() {
                pending.push(path);
            } else if path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(SUFFIX)) {
                let category = dir
                    .strip_prefix(root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                categories.entry(category).or_default().push(path);
            }
        }
    }
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }
    let categories = discover(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", SUFFIX, path.display());
        return;
    }
    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep the categories named in `requested`, including their subcategories.
fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (category, files) in all {
            if category == req || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys().map(|k| category_label(k)).collect::<Vec<_>>().join(", ")
            );
        }
    }
    selected
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Run all `.test.xml` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    let single;
    let all;
    let groups: BTreeMap<&str, &Vec<PathBuf>> = if path.is_file() {
        single = vec![path.to_path_buf()];
        BTreeMap::from([("", &single)])
    } else {
        all = discover(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", SUFFIX, path.display());
            return 1;
        }
        select(&all, categories)
    };
    if groups.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();
    for (category, files) in &groups {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }
        for file in files.iter() {
            let result = run_single_test(file);
            let label = result.description.clone().unwrap_or_else(|| {
                file.file_name()
                    .and_then(|s| s.to_str())
                    .map(|s| s.trim_end_matches(SUFFIX).to_string())
                    .unwrap_or_else(|| "?".to_string())
            });
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
