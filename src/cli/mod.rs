// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::Result;
use crate::types::DemoMode;
use crate::PluginOptions;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Reference,
    Inline,
}

impl From<Mode> for DemoMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Reference => DemoMode::Reference,
            Mode::Inline => DemoMode::Inline,
        }
    }
}

pub struct DemoCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl DemoCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        let result = match matches.subcommand() {
            Some(("build", sub_matches)) => handlers::handle_build_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new("democ")
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .author("Oar UI Development Team")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.toml or .json)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("build")
                    .about("Transform markdown documents into components")
                    .arg(Arg::new("input").help("Input markdown file or directory").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("DIR").help("Output directory"))
                    .arg(Arg::new("mode").short('m').long("mode").value_parser(clap::value_parser!(Mode)).help("Demo compilation mode"))
                    .arg(Arg::new("stats").long("stats").help("Show detailed transform statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for changes and rebuild affected documents").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Transform markdown documents without writing output")
                    .arg(Arg::new("input").help("Input markdown file or directory").required(true).index(1))
                    .arg(Arg::new("mode").short('m').long("mode").value_parser(clap::value_parser!(Mode)).help("Demo compilation mode")),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Defaults, overlaid by the config file, overlaid by flags
    pub fn build_plugin_options(&self, matches: &clap::ArgMatches) -> Result<PluginOptions> {
        let mut options = PluginOptions::default();
        self.config.apply(&mut options);
        if let Some(mode) = matches.get_one::<Mode>("mode") {
            options.mode = (*mode).into();
        }
        Ok(options)
    }

    pub fn output_directory(&self, matches: &clap::ArgMatches) -> Option<String> {
        matches
            .get_one::<String>("output")
            .cloned()
            .or_else(|| self.config.output_directory.clone())
    }
}

impl Default for DemoCli {
    fn default() -> Self {
        Self::new()
    }
}
