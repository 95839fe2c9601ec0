#![allow(non_snake_case)]
use RustedFunAnalyzer::Utils::config::AnalyzerConfig;
use RustedFunAnalyzer::Utils::logger::init_logger;
use RustedFunAnalyzer::Utils::plots::{FunctionPlotter, render_blank_png};
use RustedFunAnalyzer::analysis::analyzer::FunctionAnalyzer;
use RustedFunAnalyzer::symbolic::parse_expr::{FunctionParser, parse_x_value};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

/// Domain, range, intercepts and a chart of a real function of x
#[derive(Parser, Debug)]
#[command(name = "RustedFunAnalyzer", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Cli {
    /// the function, e.g. "sin(x) + 1/x" or "x^2 - 4"
    #[arg(allow_hyphen_values = true)]
    function: String,

    /// optional point to evaluate at; "2.5" and "2,5" are both accepted
    #[arg(allow_hyphen_values = true)]
    x0: Option<String>,

    /// TOML file with [plot] and [logging] sections
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// where to write the chart (overrides plot.output)
    #[arg(long, value_name = "PATH")]
    png: Option<PathBuf>,

    /// print the report only
    #[arg(long)]
    no_plot: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match AnalyzerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(2);
            }
        },
        None => AnalyzerConfig::default(),
    };
    init_logger(&config.logging);

    let parsed = match FunctionParser::new().parse(&cli.function) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let x0 = match parse_x_value(cli.x0.as_deref().unwrap_or("")) {
        Ok(x0) => x0,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = FunctionAnalyzer::new(&parsed).analyze(x0);
    println!("{}", report);
    println!("{}", report.summary_table());

    if cli.no_plot {
        return ExitCode::SUCCESS;
    }
    let output = cli
        .png
        .unwrap_or_else(|| PathBuf::from(&config.plot.output));
    let plotted = FunctionPlotter::with_settings(&parsed.expr, &config.plot)
        .and_then(|plotter| plotter.save_png(&output, x0, None));
    match plotted {
        Ok(figure) => {
            info!("{} samples plotted", figure.samples.len());
            println!("Chart written to {}", output.display());
        }
        Err(e) => {
            // the text report above stays valid
            eprintln!("Plot unavailable: {}", e);
            if render_blank_png(&output, &config.plot).is_ok() {
                println!("Blank chart written to {}", output.display());
            }
        }
    }
    ExitCode::SUCCESS
}
