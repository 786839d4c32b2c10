use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::QrelsArgs;
use crate::commands::session::load_corpus;
use crate::run_file::write_qrels;
use crate::util::create_text_writer;

pub fn run(args: QrelsArgs) -> Result<()> {
    let corpus = load_corpus(&args.input)?;

    let mut out = create_text_writer(&args.qrel)?;
    let written = write_qrels(&corpus, &mut out)?;
    out.flush()
        .with_context(|| format!("failed to flush {}", args.qrel.display()))?;

    info!(path = %args.qrel.display(), rows = written, "wrote qrels");
    Ok(())
}
