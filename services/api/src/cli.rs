use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use internship_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Internship Tracker",
    about = "Run or demonstrate the internship application tracker from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk through registration, tracking, and dashboard queries against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_arguments_parse() {
        let cli = Cli::try_parse_from(["tracker", "demo", "--search", "acme", "--page-size", "2"])
            .expect("arguments parse");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.search.as_deref(), Some("acme"));
                assert_eq!(args.page_size, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["tracker"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
