//! telemetry-files entry point.

use test_telemetry::cli::{self, Cli};
use test_telemetry::core::Result;

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli)
}
