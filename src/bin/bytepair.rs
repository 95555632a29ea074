use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use bytepair::{
    BpeTokenizer, IngestConfig, TokenId, Trainer, TrainerConfig,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use serde_json::json;

const DEFAULT_OUTPUT: &str = "tokenizer.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Byte-level BPE toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a new tokenizer from text inputs
    Train(TrainArgs),
    /// Encode text with a trained tokenizer
    Encode(EncodeArgs),
    /// Decode token ids back into text
    Decode(DecodeArgs),
    /// Inspect tokenizer metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the tokenizer manifest
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Target vocabulary size (including the 256 base byte tokens)
    #[arg(long, value_name = "SIZE")]
    vocab_size: Option<usize>,

    /// Register a special token as LITERAL=ID (repeat flag)
    #[arg(long = "special-token", value_name = "LITERAL=ID")]
    special_tokens: Vec<String>,

    /// Register the conventional reserved tokens (<|endoftext|> and the
    /// fill-in-the-middle markers at 50256..=50259)
    #[arg(long)]
    reserved: bool,

    /// Maximum merge iterations
    #[arg(long, value_name = "COUNT")]
    max_merge_iterations: Option<usize>,

    /// Disable per-iteration logging
    #[arg(long)]
    no_progress: bool,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during directory traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Path to a trained tokenizer manifest
    #[arg(short = 'm', long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    model: PathBuf,

    /// Text to encode; reads stdin when neither this nor --input is given
    #[arg(long, value_name = "TEXT")]
    text: Option<String>,

    /// Read the text to encode from a file
    #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Emit a JSON object instead of space-separated ids
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Path to a trained tokenizer manifest
    #[arg(short = 'm', long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    model: PathBuf,

    /// Write the decoded bytes to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Token ids to decode
    #[arg(required = true, value_name = "ID")]
    ids: Vec<TokenId>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Path to a trained tokenizer manifest
    #[arg(short = 'm', long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    model: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-2 => "off",
        -1 => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn parse_special_token(raw: &str) -> Result<(String, TokenId)> {
    let (literal, id) = raw
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("expected LITERAL=ID, got {raw:?}"))?;
    if literal.is_empty() {
        return Err(anyhow!("special token literal must not be empty: {raw:?}"));
    }
    let id = id
        .parse::<TokenId>()
        .with_context(|| format!("invalid special token id in {raw:?}"))?;
    Ok((literal.to_string(), id))
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut builder = TrainerConfig::builder()
        .show_progress(!args.no_progress)
        .max_merge_iterations(args.max_merge_iterations);
    if let Some(vocab_size) = args.vocab_size {
        builder = builder.target_vocab_size(vocab_size);
    }
    if args.reserved {
        builder = builder.reserved_special_tokens();
    }
    for raw in &args.special_tokens {
        let (literal, id) = parse_special_token(raw)?;
        builder = builder.special_token(literal, id);
    }
    let cfg = builder.build().context("invalid trainer configuration")?;

    let ingest = IngestConfig::builder()
        .recursive(!args.no_recursive)
        .follow_symlinks(args.follow_symlinks)
        .build();

    let trainer = Trainer::new(cfg);
    let artifacts = trainer
        .train_from_paths(&args.inputs, &ingest)
        .context("training failed")?;

    artifacts
        .tokenizer
        .save(&args.output)
        .with_context(|| format!("failed to write {:?}", args.output))?;

    info!(
        "wrote {:?}: vocab size {}, {} merges, stop reason {:?}",
        args.output,
        artifacts.tokenizer.vocab_size(),
        artifacts.tokenizer.merges().len(),
        artifacts.metrics.stop_reason
    );
    Ok(())
}

fn load_model(path: &PathBuf) -> Result<BpeTokenizer> {
    BpeTokenizer::load(path).with_context(|| format!("failed to load tokenizer from {path:?}"))
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let tokenizer = load_model(&args.model)?;

    let text = if let Some(text) = args.text {
        text
    } else if let Some(input) = &args.input {
        fs::read_to_string(input).with_context(|| format!("failed to read {input:?}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    };

    let tokens = tokenizer.encode_text(&text);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let payload = json!({ "count": tokens.len(), "tokens": tokens });
        writeln!(out, "{payload}")?;
    } else {
        let rendered = tokens
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{rendered}")?;
    }
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let tokenizer = load_model(&args.model)?;

    if let Some(output) = &args.output {
        let bytes = tokenizer.decode_to_bytes(&args.ids);
        fs::write(output, bytes).with_context(|| format!("failed to write {output:?}"))?;
    } else {
        let text = tokenizer.decode(&args.ids);
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{text}")?;
    }
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let tokenizer = load_model(&args.model)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Vocab size:     {}", tokenizer.vocab_size())?;
    writeln!(out, "Learned merges: {}", tokenizer.merges().len())?;
    writeln!(out, "Next merge id:  {}", tokenizer.merges().next_id())?;
    writeln!(out, "Special tokens: {}", tokenizer.special_tokens().len())?;
    for (literal, id) in tokenizer.special_tokens().sorted_by_id() {
        writeln!(out, "  {id:>10}  {literal}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_token_flag_parses() {
        let (literal, id) = parse_special_token("<|endoftext|>=50256").expect("valid flag value");
        assert_eq!(literal, "<|endoftext|>");
        assert_eq!(id, 50_256);
    }

    #[test]
    fn special_token_flag_requires_id() {
        assert!(parse_special_token("<|endoftext|>").is_err());
        assert!(parse_special_token("=5").is_err());
        assert!(parse_special_token("<|x|>=notanumber").is_err());
    }
}
