use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::mtp::ReplyFormat;

/// One-shot judge: receives one job, reports every test case, exits.
///
/// Every flag falls back to an environment variable (a `.env` file is
/// honoured).
#[derive(Parser, Debug)]
#[command(name = "ana", version)]
pub struct Cli {
    /// Session discipline
    #[arg(long, value_enum, env = "ANA_MODE", default_value_t = Mode::Streaming)]
    pub mode: Mode,

    /// Endpoint jobs arrive on (the REP endpoint in lockstep mode)
    #[arg(long, env = "ANA_RECV_ENDPOINT", default_value = "tcp://0.0.0.0:8800")]
    pub recv_endpoint: String,

    /// Endpoint reports are pushed to (streaming mode only)
    #[arg(long, env = "ANA_SEND_ENDPOINT", default_value = "tcp://0.0.0.0:8801")]
    pub send_endpoint: String,

    /// Reply encoding in lockstep mode
    #[arg(long, value_enum, env = "ANA_REPLY_FORMAT", default_value_t = ReplyFormat::Json)]
    pub reply_format: ReplyFormat,

    /// Also send the aggregate report in lockstep mode
    #[arg(long, env = "ANA_WITH_SUMMARY")]
    pub with_summary: bool,

    /// Language table (TOML); the built-in table is used if omitted
    #[arg(long, env = "LANGUAGES_CONFIG")]
    pub languages: Option<PathBuf>,

    /// Parent directory of the temporary workspaces
    #[arg(long, env = "ANA_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Compare outputs byte for byte, keeping trailing whitespace and blank lines
    #[arg(long, env = "ANA_STRICT_COMPARE")]
    pub strict_compare: bool,

    /// Captured stdout/stderr cap per stream, in bytes
    #[arg(long, env = "ANA_OUTPUT_LIMIT", default_value_t = 16 * 1024 * 1024)]
    pub output_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// REP socket, every reply acknowledged by the caller
    Lockstep,
    /// PULL socket for the job, PUSH socket for the reports
    Streaming,
}
