use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::logging::setup_logging;

/// Add punctuation to annotation segments with an LLM
#[derive(Parser, Debug)]
#[command(name = "punctuate")]
#[command(author, version, about, long_about = None)]
pub struct PunctuateArgs {
    /// Annotation file: JSON object of group key -> [{id, text, ...}]
    pub input_file: PathBuf,

    /// Output file: JSON object of group key -> [{id, text, text_with_punctuation}]
    pub output_file: PathBuf,

    /// Segments sent per request
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,

    /// Attempts per batch before falling back to default punctuation
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: u32,

    /// Pause between attempts in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,

    /// Model identifier (overrides PUNCTUATOR_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Log file, appended to on every run
    #[arg(long, default_value = "punctuate.log")]
    pub log_file: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Merge punctuated text back into the original annotation file
#[derive(Parser, Debug)]
#[command(name = "merge-punctuation")]
#[command(author, version, about, long_about = None)]
pub struct MergeArgs {
    /// Original annotation file
    pub original_file: PathBuf,

    /// Punctuated file written by `punctuate`
    pub punctuated_file: PathBuf,

    /// Merged output file
    pub output_file: PathBuf,

    /// Log file, appended to on every run
    #[arg(long, default_value = "merge_punctuation.log")]
    pub log_file: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse the process arguments
pub fn parse_args<P: Parser>() -> Result<P, ExitCode> {
    parse_args_from(std::env::args_os())
}

/// Parse `args`, the first item being the program name
///
/// `--help` and `--version` print their text and give `Err(ExitCode::SUCCESS)`.
/// Any other parse error is logged through a console-only logger and gives
/// `Err(ExitCode::FAILURE)`.
pub fn parse_args_from<P, I, T>(args: I) -> Result<P, ExitCode>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match P::try_parse_from(args) {
        Ok(args) => Ok(args),
        Err(err) if !err.use_stderr() => {
            err.print().ok();
            Err(ExitCode::SUCCESS)
        }
        Err(err) => {
            setup_logging(None, false).ok();
            error!("{}", err.to_string().trim_end());
            Err(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> String {
        format!("{:?}", ExitCode::FAILURE)
    }

    fn success() -> String {
        format!("{:?}", ExitCode::SUCCESS)
    }

    fn exit_code<P: Parser + std::fmt::Debug>(args: &[&str]) -> String {
        format!("{:?}", parse_args_from::<P, _, _>(args.iter().copied()).unwrap_err())
    }

    #[test]
    fn test_punctuate_positionals() {
        let args: PunctuateArgs = parse_args_from(["punctuate", "in.json", "out.json"]).unwrap();
        assert_eq!(args.input_file, PathBuf::from("in.json"));
        assert_eq!(args.output_file, PathBuf::from("out.json"));
        assert_eq!(args.batch_size, 25);
        assert_eq!(args.max_retries, 10);
        assert_eq!(args.log_file, PathBuf::from("punctuate.log"));

        assert_eq!(exit_code::<PunctuateArgs>(&["punctuate"]), failure());
        assert_eq!(exit_code::<PunctuateArgs>(&["punctuate", "in.json"]), failure());
        assert_eq!(
            exit_code::<PunctuateArgs>(&["punctuate", "in.json", "out.json", "extra.json"]),
            failure()
        );
    }

    #[test]
    fn test_merge_positionals() {
        let args: MergeArgs =
            parse_args_from(["merge-punctuation", "orig.json", "punct.json", "out.json"]).unwrap();
        assert_eq!(args.original_file, PathBuf::from("orig.json"));
        assert_eq!(args.punctuated_file, PathBuf::from("punct.json"));
        assert_eq!(args.output_file, PathBuf::from("out.json"));
        assert_eq!(args.log_file, PathBuf::from("merge_punctuation.log"));

        assert_eq!(
            exit_code::<MergeArgs>(&["merge-punctuation", "orig.json", "punct.json"]),
            failure()
        );
        assert_eq!(
            exit_code::<MergeArgs>(&["merge-punctuation", "a.json", "b.json", "c.json", "d.json"]),
            failure()
        );
    }

    #[test]
    fn test_bad_flag_values_fail() {
        assert_eq!(
            exit_code::<PunctuateArgs>(&["punctuate", "in.json", "out.json", "--batch-size", "0"]),
            failure()
        );
        assert_eq!(
            exit_code::<PunctuateArgs>(&["punctuate", "in.json", "out.json", "--unknown"]),
            failure()
        );
    }

    #[test]
    fn test_help_is_not_a_failure() {
        assert_eq!(exit_code::<PunctuateArgs>(&["punctuate", "--help"]), success());
        assert_eq!(exit_code::<MergeArgs>(&["merge-punctuation", "--help"]), success());
        assert_eq!(exit_code::<MergeArgs>(&["merge-punctuation", "--version"]), success());
    }
}
