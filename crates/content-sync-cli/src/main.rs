use std::process::ExitCode;

use colored::Colorize;

use content_sync_core::logging::init_logging;
use content_sync_core::{
    sync_and_launch, Config, ContentSyncError, ExtensionSet, FsSnapshotStore, KolibriRunner,
};

mod args;
use args::Cli;

fn main() -> ExitCode {
    let cli = Cli::from_env();

    let (config, config_error) = Config::from_env_or_default();
    init_logging(Some(config.log_path().as_path()));
    if let Some(e) = config_error {
        tracing::error!(error = %e, "invalid wrapper configuration, using defaults");
    }

    let mut store = FsSnapshotStore::from_config(&config);
    let result = sync_and_launch(
        &mut store,
        |extensions| kolibri_runner(&config, extensions),
        &cli.args,
    );

    match result {
        Ok(outcome) => ExitCode::from(u8::try_from(outcome.exit_code).unwrap_or(1)),
        Err(e) => fail(&e),
    }
}

fn kolibri_runner(config: &Config, extensions: &ExtensionSet) -> KolibriRunner {
    KolibriRunner::new(&config.kolibri.bin)
        .with_home(&config.home)
        .with_fallback_dirs(extensions.fallback_dirs())
}

fn fail(error: &ContentSyncError) -> ExitCode {
    eprintln!("{} {}", "[ERROR]".red().bold(), error);
    ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
}
