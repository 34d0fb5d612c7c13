//! Fetches a URL and reports whether the response body arrived in full.
//!
//! Usage:
//!   bodycheck http://localhost:8080/
//!   bodycheck --timeout 5 --allow-error-status http://localhost:8080/missing
//!
//! Exits with status 1 when the body is incomplete, its framing is broken,
//! its content cannot be decoded, or the status is not a success.

use std::time::Duration;

use bodycheck_client::{CheckConfig, CheckedResponse, ClientError, fetch};
use bodycheck_util::debug::AsciiDebug;
use bodycheck_verify::{DecodeError, Verdict};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid URL {0:?}: {1}")]
    InvalidUrl(String, &'static str),
    #[error("failed to check response")]
    Client(#[from] ClientError),
    #[error("response body failed verification: {0}")]
    Verification(Verdict),
    #[error("failed to decode the contents of the response")]
    Decode(#[source] DecodeError),
    #[error("request failed with HTTP {0}")]
    Status(u16),
}

struct CliOptions {
    url: String,
    read_timeout: Option<Duration>,
    max_head_length: usize,
    allow_error_status: bool,
}

/// The parts of an `http://` URL needed to send a request.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    authority: String,
    path: String,
}

fn parse_url(url: &str) -> Result<Target, CliError> {
    let invalid = |reason| CliError::InvalidUrl(url.to_string(), reason);
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| invalid("only http:// URLs are supported"))?;

    let (host_port, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    if host_port.is_empty() {
        return Err(invalid("missing host"));
    }

    let authority = match host_port.rsplit_once(':') {
        Some((host, port)) if !host_port.ends_with(']') => {
            if host.is_empty() || port.parse::<u16>().is_err() {
                return Err(invalid("invalid port"));
            }
            host_port.to_string()
        }
        _ => format!("{host_port}:80"),
    };

    Ok(Target {
        authority,
        path: path.to_string(),
    })
}

fn parse_args() -> Result<CliOptions, Box<dyn std::error::Error>> {
    let mut args = noargs::raw_args();
    args.metadata_mut().app_name = "bodycheck";

    noargs::HELP_FLAG.take_help(&mut args);

    let version_flag: bool = noargs::flag("version")
        .short('V')
        .doc("Show version")
        .take(&mut args)
        .is_present();
    if version_flag {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let timeout_secs: u64 = noargs::opt("timeout")
        .short('t')
        .doc("Seconds to wait for each read, 0 waits forever")
        .default("30")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    let max_head_length: usize = noargs::opt("max-head-length")
        .doc("Largest response head to accept, in bytes")
        .default("8192")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    let allow_error_status: bool = noargs::flag("allow-error-status")
        .doc("Do not fail on a non-2xx status")
        .take(&mut args)
        .is_present();

    let url: String = noargs::arg("<URL>")
        .doc("URL to fetch (e.g., http://localhost:8080/)")
        .take(&mut args)
        .then(|a| Ok::<_, &str>(a.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    if let Some(help) = args.finish().map_err(|e| format!("{:?}", e))? {
        print!("{}", help);
        std::process::exit(0);
    }

    Ok(CliOptions {
        url,
        read_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        max_head_length,
        allow_error_status,
    })
}

fn print_response(checked: &CheckedResponse) {
    if let Some(res) = checked.head() {
        println!(
            "{} {} {}",
            res.version(),
            res.code(),
            String::from_utf8_lossy(res.reason())
        );
        for (name, value) in res.headers().iter() {
            println!(
                "{}: {}",
                String::from_utf8_lossy(name),
                String::from_utf8_lossy(value)
            );
        }
        println!();
    }

    match checked.content() {
        Some(content) => {
            let bytes = content.bytes();
            println!("{:?}", AsciiDebug::with_limit(bytes, 4096));
            println!("{}", bytes.len());
        }
        None => {
            println!("{}", checked.verdict());
            println!("{}", checked.raw_len());
        }
    }
}

/// Reject anything short of a successful, complete, decodable response. An
/// error status is reported ahead of whatever happened to its body.
fn outcome(checked: CheckedResponse, allow_error_status: bool) -> Result<(), CliError> {
    if let Some(res) = checked.head()
        && !allow_error_status
        && !res.is_success()
    {
        return Err(CliError::Status(res.code()));
    }
    if !checked.verdict().is_complete() {
        return Err(CliError::Verification(checked.verdict().clone()));
    }
    match checked.into_decode_error() {
        Some(e) => Err(CliError::Decode(e)),
        None => Ok(()),
    }
}

async fn run(options: CliOptions) -> Result<(), CliError> {
    let target = parse_url(&options.url)?;
    debug!(?target, "fetching");

    let config = CheckConfig::default()
        .with_read_timeout(options.read_timeout)
        .with_max_head_length(options.max_head_length);
    let checked = fetch(&target.authority, &target.path, &config).await?;

    print_response(&checked);
    outcome(checked, options.allow_error_status)
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: could not start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(err) = rt.block_on(run(options)) {
        eprintln!("error: {err}");
        let mut cause = std::error::Error::source(&err);
        while let Some(c) = cause {
            eprintln!("  cause: {c}");
            cause = c.source();
        }
        std::process::exit(1);
    }
}
