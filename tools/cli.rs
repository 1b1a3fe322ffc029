use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tinted::{HighlightOptions, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `<span class="token ...">` markup
    Html,
    /// The token tree as JSON
    Tokens,
}

/// Highlights a file, or stdin, with the builtin grammars and any grammar files given.
#[derive(Debug, Parser)]
#[command(name = "tinted-cli", version, about)]
struct Cli {
    /// Language to highlight with. Defaults to the file extension.
    #[arg(short, long)]
    lang: Option<String>,

    /// Directory of JSON grammar files to load on top of the builtin ones.
    #[arg(short, long = "grammars", value_name = "DIR")]
    grammars: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Print the known languages and exit
    #[arg(long)]
    list: bool,

    /// File to highlight, stdin if missing
    file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut registry = Registry::builtin()?;
    for dir in &cli.grammars {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();
        for path in paths {
            if path.extension() == Some("json".as_ref()) {
                registry.add_grammar_from_path(&path)?;
            }
        }
    }
    for name in registry.missing_grammars() {
        eprintln!("warning: grammar '{name}' is referenced but was never loaded");
    }

    if cli.list {
        for name in registry.languages() {
            println!("{name}");
        }
        return Ok(());
    }

    let code = match &cli.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut code = String::new();
            io::stdin().read_to_string(&mut code)?;
            code
        }
    };

    let lang = cli
        .lang
        .clone()
        .or_else(|| {
            cli.file
                .as_ref()
                .and_then(|p| p.extension())
                .map(|ext| ext.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| tinted::PLAIN_GRAMMAR_NAME.to_string());

    match cli.format {
        Format::Html => {
            let options = HighlightOptions::new(&lang).fallback_to_plain(true);
            println!("{}", registry.highlight(&code, options)?);
        }
        Format::Tokens => {
            let id = registry
                .grammar_id(&lang)
                .ok_or_else(|| tinted::Error::GrammarNotFound(lang.clone()))?;
            let fragments = registry.tokenize(&code, id)?;
            println!("{}", serde_json::to_string_pretty(&fragments)?);
        }
    }

    Ok(())
}
