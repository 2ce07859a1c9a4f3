//! article - convert, preview, sanitize and edit Markdown/HTML articles

use anyhow::{Context, Result};
use article_core::toc::{extract_headings, render_toc};
use article_core::{
    apply_toolbar_action, convert_content, get_preview_html, html_to_markdown, sanitize_html,
    sanitize_html_with_report, Config, EditorMode, TextSelection, ToolbarAction, ToolbarOptions,
};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Markdown/HTML article content engine
#[derive(Parser, Debug)]
#[command(name = "article")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an article between Markdown and HTML
    Convert {
        /// Input file, or `-` for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Target mode
        #[arg(long)]
        to: EditorMode,
        /// Source mode; inferred from the extension when omitted
        #[arg(long)]
        from: Option<EditorMode>,
    },
    /// Print preview HTML
    Preview {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        mode: Option<EditorMode>,
        /// Skip sanitizing (ignored in safe mode)
        #[arg(long)]
        no_sanitize: bool,
    },
    /// Remove executable constructs from HTML
    Sanitize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Log every finding to stderr
        #[arg(long)]
        report: bool,
    },
    /// Print a Markdown table of contents
    Toc {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        mode: Option<EditorMode>,
    },
    /// Apply a toolbar action and print the new content
    Apply {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        action: ToolbarAction,
        /// Selection start (character offset)
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Selection end (character offset); defaults to the start
        #[arg(long)]
        end: Option<usize>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        alt: Option<String>,
        #[arg(long)]
        mode: Option<EditorMode>,
    },
}

/// Read a file, or stdin for `-`
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Explicit mode, then the file extension, then the configured default
fn resolve_mode(explicit: Option<EditorMode>, path: &Path, config: &Config) -> EditorMode {
    explicit
        .or_else(|| EditorMode::from_path(path))
        .unwrap_or(config.editor.default_mode)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (config, events) = Config::load().context("Failed to load configuration")?;
    for event in &events {
        info!("{}", event);
    }

    match args.command {
        Command::Convert { file, to, from } => {
            let content = read_input(&file)?;
            let from = resolve_mode(from, &file, &config);
            debug!("convert {} -> {}", from, to);
            print!("{}", convert_content(&content, from, to));
        }
        Command::Preview {
            file,
            mode,
            no_sanitize,
        } => {
            let content = read_input(&file)?;
            let mode = resolve_mode(mode, &file, &config);
            let html = get_preview_html(&content, mode);
            let sanitize = if no_sanitize {
                if config.security.safe_mode {
                    warn!("Safe mode is on; --no-sanitize ignored");
                }
                config.security.safe_mode
            } else {
                config.sanitize_preview()
            };
            let html = if sanitize { sanitize_html(&html) } else { html };
            print!("{}", html);
        }
        Command::Sanitize { file, report } => {
            let content = read_input(&file)?;
            let (html, findings) = sanitize_html_with_report(&content);
            if report {
                for finding in &findings {
                    eprintln!("{}", finding);
                }
            }
            print!("{}", html);
        }
        Command::Toc { file, mode } => {
            let content = read_input(&file)?;
            let markdown = match resolve_mode(mode, &file, &config) {
                EditorMode::Markdown => content,
                EditorMode::Html => html_to_markdown(&content),
            };
            let headings = extract_headings(&markdown.as_str().into());
            print!("{}", render_toc(&headings));
        }
        Command::Apply {
            file,
            action,
            start,
            end,
            url,
            alt,
            mode,
        } => {
            let content = read_input(&file)?;
            let mode = resolve_mode(mode, &file, &config);
            let selection = TextSelection::new(&content, start, end.unwrap_or(start));
            let result = apply_toolbar_action(&ToolbarOptions {
                content: &content,
                selection,
                mode,
                action,
                url: url.as_deref(),
                alt: alt.as_deref(),
            });
            print!("{}", result.new_content);
            eprintln!(
                "selection: {}..{}",
                result.new_selection_start, result.new_selection_end
            );
        }
    }

    Ok(())
}
