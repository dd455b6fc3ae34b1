use crate::cli::args::{Args, Command, ConfigCommand};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::operations::Session;
use crate::domain::config::XbeeConfig;
use crate::domain::error::XbeeError;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::input::BlockingReader;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::available_ports;
use std::path::PathBuf;

/// Execute CLI command
pub async fn execute_command(args: Args) -> Result<(), XbeeError> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let mut config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };
    if let Some(baud) = args.baud {
        config.serial = config.serial.with_baud_rate(baud);
    }

    init_logging(&config.global.log_level, args.verbose, args.quiet).map_err(|e| {
        XbeeError::Config {
            message: format!("Failed to initialize logging: {}", e),
        }
    })?;

    let session = Session::system(&config);

    match args.command {
        Command::Cp { source, target } => {
            session.copy(source.as_str(), target.as_str()).await?;
            Ok(())
        }
        Command::Ls { source } => {
            let entries = session.list(source.as_str()).await?;
            writer.write_lines(&entries)?;
            Ok(())
        }
        Command::Rm { source } => session.remove(source.as_str()).await,
        Command::At {
            path,
            cmd,
            terminator,
        } => {
            let lines = session.command(&path, &cmd, terminator.as_deref()).await?;
            writer.write_lines(&lines)?;
            Ok(())
        }
        Command::Info { paths } => {
            let records = session.info(&paths).await?;
            writer.write_info(&records)?;
            Ok(())
        }
        Command::Tail { path, interactive } => {
            let mut stdout = tokio::io::stdout();
            if interactive {
                let mut stdin = BlockingReader::stdin();
                session.tail_interactive(&path, &mut stdin, &mut stdout).await?;
            } else {
                session.tail(&path, &mut stdout).await?;
            }
            Ok(())
        }
        Command::Ports => {
            writer.write_ports(&available_ports()?)?;
            Ok(())
        }
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("xbee {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &XbeeConfig,
    config_manager: &ConfigManager,
) -> Result<(), XbeeError> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Init { dir, global } => {
            let written = if global {
                config_manager.init_global_config()?
            } else {
                let dir = match dir {
                    Some(dir) => PathBuf::from(dir),
                    None => std::env::current_dir().map_err(|e| XbeeError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                config_manager.init_project_config(&dir)?
            };
            writer.write_message(&format!("Configuration initialized at '{}'", written.display()))?;
            Ok(())
        }
    }
}
