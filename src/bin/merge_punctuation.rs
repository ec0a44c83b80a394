use std::process::ExitCode;

use tracing::{error, info, warn};

use punctuator::cli::{parse_args, MergeArgs};
use punctuator::{execute_merge, setup_logging};

fn main() -> ExitCode {
    let cli: MergeArgs = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    if let Err(e) = setup_logging(Some(&cli.log_file), cli.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match execute_merge(&cli.original_file, &cli.punctuated_file, &cli.output_file) {
        Ok(summary) => {
            info!(
                "Complete: {} of {} segments replaced across {} groups",
                summary.replaced, summary.segments, summary.groups
            );
            if summary.unmatched > 0 {
                warn!("{} segments kept their original text", summary.unmatched);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Program failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
