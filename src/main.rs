//! Command line front end: spawn a program, optionally send it a line, and
//! wait for one of a set of patterns.

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use ptyexpect::{config, Outcome, Pattern, PatternKind, Session};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ptyexpect")]
#[command(author, version, about = "Wait for patterns in the output of an interactive program", long_about = None)]
struct Args {
    /// Seconds to wait for a match (negative waits forever)
    #[arg(short, long, default_value_t = config::DEFAULT_TIMEOUT_SECS, allow_negative_numbers = true)]
    timeout: i64,

    /// Wait for this exact text
    #[arg(long, value_name = "TEXT")]
    exact: Vec<String>,

    /// Wait for text matching this shell glob
    #[arg(long, value_name = "GLOB")]
    glob: Vec<String>,

    /// Wait for text matching this regular expression
    #[arg(long, value_name = "REGEX")]
    regexp: Vec<String>,

    /// Line sent to the program before waiting
    #[arg(short, long, value_name = "TEXT")]
    send: Option<String>,

    /// Log what the matcher is doing to stderr
    #[arg(long)]
    debug: bool,

    /// Copy the program's output to stdout
    #[arg(long)]
    echo: bool,

    /// Program to run, followed by its arguments
    #[arg(last = true, required = true, num_args = 1..)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args, &matches).await {
        Ok(Outcome::Matched(result)) => {
            println!("{}", result.value);
            // Exit codes are a single byte
            ExitCode::from(u8::try_from(result.value).unwrap_or(u8::MAX))
        }
        Ok(outcome) => {
            eprintln!("ptyexpect: no match ({})", describe(&outcome));
            println!("{}", outcome.code());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("ptyexpect: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, matches: &ArgMatches) -> Result<Outcome> {
    config::set_timeout(args.timeout);
    config::set_debugging(args.debug);
    config::set_log_to_console(args.echo);

    let patterns = patterns_in_order(args, matches);
    if patterns.is_empty() {
        anyhow::bail!("no patterns given; use --exact, --glob or --regexp");
    }
    ptyexpect::validate(&patterns)?;

    let (program, program_args) = args
        .command
        .split_first()
        .context("no program given")?;
    let program_args: Vec<&str> = program_args.iter().map(String::as_str).collect();

    let mut session = Session::spawn(program, &program_args)
        .with_context(|| format!("cannot run {}", program))?;

    if let Some(line) = &args.send {
        session.send_line(line).await?;
    }

    let outcome = session.expect(&patterns).await?;

    if !outcome.is_match() {
        let _ = session.kill();
    }
    Ok(outcome)
}

/// Build the pattern list in the order the options appeared on the command
/// line, numbering them from zero.
fn patterns_in_order(args: &Args, matches: &ArgMatches) -> Vec<Pattern> {
    let mut ordered: Vec<(usize, PatternKind, &str)> = Vec::new();
    for (id, kind, texts) in [
        ("exact", PatternKind::Exact, &args.exact),
        ("glob", PatternKind::Glob, &args.glob),
        ("regexp", PatternKind::RegExp, &args.regexp),
    ] {
        if let Some(indices) = matches.indices_of(id) {
            ordered.extend(
                indices
                    .zip(texts)
                    .map(|(index, text)| (index, kind, text.as_str())),
            );
        }
    }
    ordered.sort_by_key(|(index, _, _)| *index);

    ordered
        .into_iter()
        .zip(0u32..)
        .map(|((_, kind, text), value)| Pattern::new(kind, text, value))
        .collect()
}

fn describe(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Matched(_) => "matched",
        Outcome::Timeout => "timeout",
        Outcome::Eof => "end of file",
        Outcome::FullBuffer => "buffer full",
    }
}
