use clap::Parser;
use sweepstat::{Args, build_sections, init_logging, load_results, render};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let loaded = load_results(&args.results_file)?;
    if let Some(name) = loaded.run_name() {
        tracing::info!(run = name, "analyzing run");
    }

    let sections = build_sections(&args, &loaded);
    if sections.is_empty() {
        tracing::warn!("no analysis requested; pass --analysis, --ci, --pairwise or --view");
    }
    print!("{}", render(&args, &sections)?);
    Ok(())
}
