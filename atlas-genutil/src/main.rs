use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::{prelude::*, EnvFilter};

use atlas_genutil::{
    cli::{build_command, config_from_matches, GENTX_COMMAND},
    msg_builder::detect_local_ip,
    report, run_gentx, Collaborators,
};

/// `--log-level`, else `RUST_LOG`, else `warn`. Unparsable filters fall back
/// to `warn`.
fn log_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn init_logging(log_level: Option<&str>) {
    let filter = log_filter(log_level);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn main() -> ExitCode {
    let collaborators = Collaborators::default();
    let builder = collaborators.msg_builder.as_ref();

    // 1. Assemble the command; flag collisions surface here.
    let command = match build_command(builder, &detect_local_ip().to_string()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 2. Parse. Usage errors exit with status 2.
    let matches = command.get_matches();
    let Some((GENTX_COMMAND, sub_matches)) = matches.subcommand() else {
        return ExitCode::from(2);
    };

    let (config, log_level) = match config_from_matches(sub_matches, builder) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(log_level.as_deref());

    // 3. Run.
    match run_gentx(&config, &collaborators) {
        Ok(output) => {
            if let Err(e) = report(&output, &mut std::io::stderr()) {
                error!("failed to print status: {}", e);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = %e.stage(), kind = ?e.kind(), "gentx failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
