mod config;
mod logging;
mod test_runner;

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::{debug, info};

use pyblocks::markup::{self, Loaded};
use pyblocks::render::{Renderer, svg};
use pyblocks::{BlockId, Catalog, EditorSession};

const SUBCOMMANDS: &[&str] = &["check", "types", "gen", "render", "test", "help"];

#[derive(Parser)]
#[command(name = "pyblocks", version, about = "Typed Python block workspaces")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// TOML file of extra block kinds, added to the built-in Python kinds
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a workspace and report markup problems and type advisories
    Check(CheckArgs),

    /// Print the admissible type vectors of every block
    Types(FileArgs),

    /// Generate Python from a workspace
    Gen(OutputArgs),

    /// Lay out a workspace and write it as SVG
    Render(OutputArgs),

    /// Run .test.xml test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Workspace markup file
    file: String,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Workspace markup file
    file: String,

    /// Exit with an error if there are any warnings or advisories
    #[arg(long)]
    strict: bool,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Workspace markup file
    file: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.xml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// A loaded workspace and the source it came from.
struct Workspace {
    session: EditorSession,
    loaded: Loaded,
    files: SimpleFiles<String, String>,
    file_id: usize,
}

struct Reporter {
    writer: StandardStream,
    config: term::Config,
}

fn main() {
    // `pyblocks file.xml` works like `pyblocks gen file.xml`.
    let mut args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--catalog" {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            if !SUBCOMMANDS.contains(&arg) {
                args.insert(i, "gen".to_string());
            }
            break;
        }
    }

    let cli = Cli::parse_from(&args);
    logging::init(cli.no_color);

    let reporter = Reporter {
        writer: StandardStream::stderr(if cli.no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        }),
        config: term::Config::default(),
    };

    let catalog = cli.catalog.as_deref();
    match cli.command {
        Command::Check(args) => do_check(args, load_catalog(catalog), &reporter),
        Command::Types(args) => do_types(args, load_catalog(catalog), &reporter),
        Command::Gen(args) => do_gen(args, load_catalog(catalog), &reporter),
        Command::Render(args) => do_render(args, load_catalog(catalog), &reporter),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            info!(path = %test_args.path, "running tests");
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Catalog {
    match config::load_catalog(path) {
        Ok(c) => {
            debug!(catalog = ?path, "block kinds loaded");
            c
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn open(file: &str, catalog: Catalog, reporter: &Reporter) -> Workspace {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.to_string(), source.clone());

    let mut session = EditorSession::new(catalog);
    let loaded = match markup::load(&source, file_id, &mut session) {
        Ok(l) => l,
        Err(errors) => {
            for error in &errors {
                reporter.emit(&files, &error.to_diagnostic());
            }
            process::exit(1);
        }
    };
    for warning in &loaded.warnings {
        reporter.emit(&files, &warning.to_diagnostic());
    }

    Workspace {
        session,
        loaded,
        files,
        file_id,
    }
}

impl Reporter {
    fn emit(&self, files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, files, diagnostic);
    }

    /// Report a problem about one block, pointing at its tag when the block came from source.
    fn emit_for_block(&self, workspace: &Workspace, severity: Severity, message: String, block: Option<BlockId>) {
        match block_span(&workspace.loaded, block) {
            Some(span) => {
                let diagnostic = Diagnostic::new(severity)
                    .with_message(message)
                    .with_labels(vec![Label::primary(workspace.file_id, span)]);
                self.emit(&workspace.files, &diagnostic);
            }
            None => {
                let prefix = if severity == Severity::Warning {
                    "warning"
                } else {
                    "error"
                };
                eprintln!("{}: {}", prefix, message);
            }
        }
    }
}

fn do_check(args: CheckArgs, catalog: Catalog, reporter: &Reporter) {
    let workspace = open(&args.file, catalog, reporter);
    let advisories = workspace.session.advisories();
    for advisory in &advisories {
        reporter.emit_for_block(
            &workspace,
            Severity::Warning,
            advisory.to_string(),
            Some(advisory.block()),
        );
    }

    let warnings = workspace.loaded.warnings.len() + advisories.len();
    eprintln!(
        "ok: {} loaded {} block(s), {} warning(s)",
        args.file,
        workspace.session.len(),
        warnings
    );
    if args.strict && warnings > 0 {
        process::exit(1);
    }
}

fn do_types(args: FileArgs, catalog: Catalog, reporter: &Reporter) {
    let workspace = open(&args.file, catalog, reporter);
    let names: BTreeMap<BlockId, &str> = workspace
        .loaded
        .names
        .iter()
        .map(|(name, id)| (*id, name.as_str()))
        .collect();
    let mut out = String::new();
    for top in workspace.session.top_blocks_ordered() {
        describe_chain(&workspace.session, &names, top, 0, &mut out);
    }
    print!("{}", out);
}

fn describe_chain(
    session: &EditorSession,
    names: &BTreeMap<BlockId, &str>,
    head: BlockId,
    depth: usize,
    out: &mut String,
) {
    let mut cur = Some(head);
    while let Some(id) = cur {
        let Some(block) = session.block(id) else {
            return;
        };
        let label = match names.get(&id) {
            Some(name) => format!("{} ({})", id, name),
            None => id.to_string(),
        };
        out.push_str(&format!(
            "{}{} {}: {}\n",
            "  ".repeat(depth),
            label,
            block.kind_name(),
            block.type_vecs
        ));
        let next = session.next_block(id);
        for child in session.child_blocks(id) {
            if Some(child) != next {
                describe_chain(session, names, child, depth + 1, out);
            }
        }
        cur = next;
    }
}

fn do_gen(args: OutputArgs, catalog: Catalog, reporter: &Reporter) {
    let workspace = open(&args.file, catalog, reporter);
    let output = match pygen::generate(&workspace.session) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    for warning in &output.warnings {
        let severity = if warning.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        reporter.emit_for_block(&workspace, severity, warning.to_string(), warning.block);
    }
    write_output(args.output.as_deref(), &output.code);
}

fn do_render(args: OutputArgs, catalog: Catalog, reporter: &Reporter) {
    let mut workspace = open(&args.file, catalog, reporter);
    let mut renderer: Renderer = Renderer::default();
    renderer.render_all(&mut workspace.session);
    let document = svg::write_document(&workspace.session, &renderer);
    write_output(args.output.as_deref(), &document);
}

fn write_output(path: Option<&Path>, text: &str) {
    match path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
        }
        None => print!("{}", text),
    }
}

/// Byte range of the opening tag of `block`, if it was loaded from markup.
pub fn block_span(loaded: &Loaded, block: Option<BlockId>) -> Option<Range<usize>> {
    block.and_then(|b| loaded.spans.get(&b)).cloned()
}
