//! Batch dispatch command handler.

use super::{RunArgs, load_config};
use colloquy::{
    ColloquyResult, Dispatcher, IoError, open_results, read_completed, read_submissions,
    write_results,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, instrument};

fn open(path: &Path) -> ColloquyResult<BufReader<File>> {
    let file = File::open(path).map_err(|e| IoError::new(path, e.to_string()))?;
    Ok(BufReader::new(file))
}

/// Dispatch the batch in `args.input` and write its results.
#[instrument(skip_all, fields(input = %args.input.display()))]
pub async fn run_batch(args: RunArgs) -> ColloquyResult<()> {
    let config = load_config(args.config.as_deref())?;
    let submissions = read_submissions(open(&args.input)?)?;
    let completed = match &args.resume {
        Some(path) => read_completed(open(path)?)?,
        None => HashSet::new(),
    };
    let order: Vec<String> = submissions.iter().map(|s| s.id.clone()).collect();

    let dispatcher = Dispatcher::new(config);
    let report = dispatcher
        .dispatch_resuming(submissions, args.limit(), &completed)
        .await?;

    let ids = order.iter().map(String::as_str);
    match &args.output {
        Some(path) => {
            let output = open_results(path, args.resume.as_deref())?;
            let written = write_results(output, &report, ids)?;
            info!(written, output = %path.display(), "Wrote results");
            println!("{}", report.summary);
            if let Some(tokens) = report.summary.token_report() {
                println!("{}", tokens);
            }
        }
        None => {
            write_results(std::io::stdout().lock(), &report, ids)?;
            eprintln!("{}", report.summary);
        }
    }

    Ok(())
}
