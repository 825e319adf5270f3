use anyhow::Result;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod report;
mod cmd_init;
mod cmd_scan;
mod cmd_merge;
mod cmd_stage;
mod cmd_status;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    // Пример: RUST_LOG=debug ./banalytiq merge --dir .
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        // Логируем ошибку и выходим с кодом 1.
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Init { dir } =>
            cmd_init::exec(dir),

        cli::Cmd::Scan { dir, json } =>
            cmd_scan::exec(dir, json),

        cli::Cmd::Merge { dir, json } =>
            cmd_merge::exec(dir, json),

        cli::Cmd::Stage { dir, file, no_merge, json } =>
            cmd_stage::exec(dir, file, no_merge, json),

        cli::Cmd::Status { dir, json } =>
            cmd_status::exec(dir, json),
    }
}
