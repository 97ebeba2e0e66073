use std::io;

use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use promql_opentsdb::cliopt::{select_range, CliOpt, Command};
use promql_opentsdb::context::QueryContext;
use promql_opentsdb::output::{Encoder, HumanReadableEncoder, LineWriter, PromApiEncoder};
use promql_opentsdb::runner::Runner;
use promql_opentsdb::server;
use promql_opentsdb::storage::OpenTsdbQueryable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = CliOpt::from_args();

    let default_level = if opt.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = opt.config()?;

    match opt.cmd {
        Command::Serve => server::run_server(config).await?,
        Command::Select {
            selector,
            start,
            end,
            encode,
        } => {
            let encoder: Box<dyn Encoder> = match encode.as_deref() {
                None => Box::new(PromApiEncoder::new()),
                Some("h") => Box::new(HumanReadableEncoder::new()),
                Some(other) => return Err(format!("unknown encoding {:?}", other).into()),
            };
            let range = select_range(start, end)?;

            let ctx = QueryContext::with_timeout(config.query_timeout());
            let canceller = ctx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    canceller.cancel();
                }
            });

            let mut runner = Runner::new(
                Box::new(OpenTsdbQueryable::new(config)?),
                encoder,
                Box::new(LineWriter::new(io::stdout())),
            );
            runner.select(&ctx, &selector, range).await?;
        }
    }

    Ok(())
}
