use clap::Parser;

use umi_dedup_suite::flagfix::run_fix_flags;
use umi_dedup_suite::logging::init_logging;
use umi_dedup_suite::options::FixFlagsOptions;

fn main() {
    let opts = FixFlagsOptions::parse();
    init_logging(opts.verbose);

    if let Err(err) = run_fix_flags(&opts) {
        log::error!("{:#}", err);
        std::process::exit(err.exit_code());
    }
}
