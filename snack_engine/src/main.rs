use anyhow::Result;

mod cli;
mod runtime;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;
    runtime::execute(args)
}
