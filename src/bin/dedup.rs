use clap::Parser;

use umi_dedup_suite::dedup::run_dedup;
use umi_dedup_suite::logging::init_logging;
use umi_dedup_suite::options::DedupOptions;

fn main() {
    let opts = DedupOptions::parse();
    init_logging(opts.verbose);

    if let Err(err) = run_dedup(&opts) {
        log::error!("{:#}", err);
        std::process::exit(err.exit_code());
    }
}
