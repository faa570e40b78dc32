use super::super::args::*;
use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Infer(args) => super::infer::run(args).await,
        Command::Export(args) => super::export::run(args),
        Command::Score(args) => super::score::run(args),
        Command::Log(args) => super::log::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
