use clap::Parser;

use umi_dedup_suite::demultiplex::run_demultiplex;
use umi_dedup_suite::logging::init_logging;
use umi_dedup_suite::options::DemuxOptions;

fn main() {
    let opts = DemuxOptions::parse();
    init_logging(opts.verbose);

    if let Err(err) = run_demultiplex(&opts) {
        log::error!("{:#}", err);
        std::process::exit(err.exit_code());
    }
}
