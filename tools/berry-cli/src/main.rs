mod cli;
mod report;
mod runner;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use mr_berry::Params;
use simple_logger::SimpleLogger;

use cli::Cli;

/// 加载参数: 命令行指定的文件优先, 其次是默认位置, 最后是默认值.
fn load_params(cli: &Cli) -> anyhow::Result<Params> {
    let mut params = match cli.config.as_deref() {
        Some(p) => Params::from_file(p).with_context(|| format!("无法加载参数 {}", p.display()))?,
        None => Params::load_or_default()?,
    };
    if let Some(o) = cli.command.overrides() {
        o.apply_to(&mut params);
    }
    params.validate()?;
    log::debug!("{params:?}");
    Ok(params)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let params = load_params(&cli)?;
    let report = runner::run(&cli.command, &params)?;
    if let Some(path) = cli.report.as_deref() {
        report.write_to(path)?;
    }
    Ok(())
}
