use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI для слияния timestamped-снапшотов banalytiq с базовым хранилищем.
///
/// Имя базы и суффикс retirement задаются через BQ_BASE_FILE / BQ_RETIRE_SUFFIX.
#[derive(Parser, Debug)]
#[command(name = "banalytiq", version, about = "banalytiq snapshot merge tool")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create an empty base store (schema + identity index)
    Init {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// List pending timestamped snapshots (oldest first)
    Scan {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Merge existing timestamped snapshots only
    ///
    /// Пример:
    ///   banalytiq merge
    ///   banalytiq merge --dir /srv/analytics --json
    Merge {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Stage a downloaded database file, then merge
    ///
    /// Файл становится базой, если её ещё нет; иначе — <stem>.<unix-ts>.<ext>.
    Stage {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Downloaded database file
        #[arg(long)]
        file: PathBuf,
        /// Stage only, skip merging
        #[arg(long, default_value_t = false)]
        no_merge: bool,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Base row count, pending snapshots and merge counters
    Status {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
