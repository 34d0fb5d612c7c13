//! Serves one canned response per connection.
//!
//! Usage:
//!   bodycheck-harness --fixture short-chunk
//!   bodycheck-harness --port 9000 --fixture gzip

use bodycheck_harness::{FaultServer, Fixture, HarnessResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct HarnessOptions {
    port: u16,
    fixture: Fixture,
}

fn parse_args() -> Result<HarnessOptions, Box<dyn std::error::Error>> {
    let mut args = noargs::raw_args();
    args.metadata_mut().app_name = "bodycheck-harness";

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

    let port: u16 = noargs::opt("port")
        .short('p')
        .doc("Port to listen on")
        .default("8080")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    let fixture: Fixture = noargs::opt("fixture")
        .short('f')
        .doc(
            "Response to serve: short-content-length, short-chunk, short-gzip, \
             hello, chunked, gzip, until-close, aborted-chunk",
        )
        .default("short-content-length")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    if let Some(help) = args.finish().map_err(|e| format!("{:?}", e))? {
        print!("{}", help);
        std::process::exit(0);
    }

    Ok(HarnessOptions { port, fixture })
}

async fn server(options: HarnessOptions) -> HarnessResult<()> {
    let server = FaultServer::bind(("localhost", options.port), options.fixture).await?;
    info!(addr = %server.local_addr()?, fixture = %options.fixture, "listening");
    server.serve().await
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;

    rt.block_on(server(options))?;
    Ok(())
}
