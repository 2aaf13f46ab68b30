use crate::cli::{LoginArgs, SaveArgs, SearchArgs, StatusArgs, UrlArgs};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wayback::ArchiveClient;
use wayback::client::{
    AuthorizationContext, CaptureOption, CaptureOptions, CaptureStatus, CaptureWatch, JobId,
    PendingProgress,
};
use wayback::config::Config;
use wayback::error::ArchiveError;
use wayback::urls::{encode_whitespace, normalize_url};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn login(config: &Config, args: LoginArgs) -> Result<(), AnyError> {
    let client = ArchiveClient::new(config)?;
    let session = client.login_session(&args.email, &args.password).await?;

    if args.session {
        print_json(&session)?;
    } else {
        print_json(&session.authorization())?;
    }

    Ok(())
}

pub async fn check(config: &Config, args: UrlArgs) -> Result<(), AnyError> {
    let client = ArchiveClient::new(config)?;
    let url = typed_url(&args.url)?;

    let result = client.check_availability(&url).await;
    print_json(&result)
}

pub async fn search(config: &Config, args: SearchArgs) -> Result<(), AnyError> {
    let client = ArchiveClient::new(config)?;
    let url = typed_url(&args.url)?;

    if args.count {
        print_json(&client.wayback_count(&url).await?)
    } else {
        print_json(&client.search_snapshots(&url).await?)
    }
}

pub async fn save(config: &Config, args: SaveArgs) -> Result<(), AnyError> {
    let client = ArchiveClient::new(config)?;
    let auth = require_auth(config)?;
    let url = typed_url(&args.url)?;

    let mut options = CaptureOptions::new();
    if args.all_errors {
        options.insert(CaptureOption::AllErrors);
    }
    if args.outlinks {
        options.insert(CaptureOption::Outlinks);
    }
    if args.screenshot {
        options.insert(CaptureOption::Screenshot);
    }

    let job_id = client.submit_capture(&url, &auth, &options).await?;
    if args.no_wait {
        println!("{}", job_id);
        return Ok(());
    }

    let delay = client.poll_policy().initial_delay;
    tokio::time::sleep(delay).await;

    let watch = client.poll_status(job_id, auth, options);
    follow(watch).await
}

pub async fn status(config: &Config, args: StatusArgs) -> Result<(), AnyError> {
    let client = ArchiveClient::new(config)?;
    let auth = require_auth(config)?;
    let job_id = JobId::new(args.job_id);
    let options = CaptureOptions::new();

    if args.once {
        match client.fetch_status(&job_id, &auth, &options).await? {
            CaptureStatus::Pending { resources } => {
                println!("pending ({} resources)", resources.len());
            }
            CaptureStatus::Succeeded(success) => print_json(&success)?,
        }
        return Ok(());
    }

    let watch = client.poll_status(job_id, auth, options);
    follow(watch).await
}

pub fn show_config(config: &Config) -> Result<(), AnyError> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Poll to completion; Ctrl+C cancels the watch instead of killing the process
async fn follow(watch: CaptureWatch) -> Result<(), AnyError> {
    let job_id = watch.job_id().clone();
    let token = watch.cancellation_token();
    tokio::spawn(cancel_on_ctrl_c(token.clone()));

    info!(job_id = %job_id, "Waiting for capture to finish");

    let result = watch
        .wait(|progress: &PendingProgress| {
            info!(
                job_id = %progress.job_id,
                attempt = progress.attempt,
                resources = progress.resource_count(),
                "Saving..."
            );
        })
        .await;
    token.cancel();

    match result {
        Ok(success) => print_json(&success),
        Err(ArchiveError::Cancelled) => {
            info!(job_id = %job_id, "Stopped waiting; the capture may still complete server-side");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => token.cancel(),
        _ = token.cancelled() => {}
    }
}

fn require_auth(config: &Config) -> Result<AuthorizationContext, AnyError> {
    config.authorization().ok_or_else(|| {
        "not logged in: set WAYBACK_ACCESS_KEY and WAYBACK_SECRET_KEY \
         (or WAYBACK_LOGGED_IN_USER and WAYBACK_LOGGED_IN_SIG)"
            .into()
    })
}

/// Clean up a URL typed by a user
fn typed_url(raw: &str) -> Result<String, AnyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArchiveError::InvalidUrl("empty URL".to_string()).into());
    }
    Ok(normalize_url(&encode_whitespace(trimmed)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
