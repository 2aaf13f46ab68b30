use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wayback")]
#[command(
    about = "Wayback Machine client: availability, search and Save Page Now",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to archive.org and print the resulting credentials as JSON
    Login(LoginArgs),
    /// Check whether a URL has an archived snapshot
    Check(UrlArgs),
    /// List captures of a URL from the CDX index
    Search(SearchArgs),
    /// Capture a URL with Save Page Now and wait for the result
    Save(SaveArgs),
    /// Follow an existing capture job until it finishes
    Status(StatusArgs),
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    /// Account password (read from WAYBACK_PASSWORD when omitted)
    #[arg(long, env = "WAYBACK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Print the full session (cookies and keys) instead of key authorization only
    #[arg(long)]
    pub session: bool,
}

#[derive(clap::Args, Debug)]
pub struct UrlArgs {
    pub url: String,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    pub url: String,

    /// Print only the capture count and date range
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct SaveArgs {
    pub url: String,

    /// Save the page even if it answers with an error status
    #[arg(long)]
    pub all_errors: bool,

    /// Also capture the page's outlinks
    #[arg(long)]
    pub outlinks: bool,

    /// Store a full-page screenshot
    #[arg(long)]
    pub screenshot: bool,

    /// Return right after submission, printing the job id
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    pub job_id: String,

    /// Query once instead of polling to completion
    #[arg(long)]
    pub once: bool,
}
