use clap::{Parser, Subcommand};
use glvk_cli::demo::{Demo, DemoOptions};
use glvk_cli::dump::{self, DumpFormat};
use glvk_core::config::default_config_path;
use glvk_core::GlvkConfig;
use tracing::info;

#[derive(Parser)]
#[command(name = "glvk")]
#[command(about = "glvk - Vulkan command recording replayed on OpenGL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a demo frame, dump its streams and replay it on a recording backend
    Demo {
        /// Output format for the decoded streams
        #[arg(short, long, value_enum, default_value_t = DumpFormat::Text)]
        format: DumpFormat,

        /// Number of draws in the frame
        #[arg(short, long, default_value_t = 1)]
        draws: u32,

        /// Also print every GL call issued during replay
        #[arg(long)]
        calls: bool,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<String>) -> GlvkConfig {
    let path = path.unwrap_or_else(default_config_path);
    info!("using configuration from {}", path);
    GlvkConfig::load_or_default(&path)
}

fn main() -> anyhow::Result<()> {
    glvk_common::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            format,
            draws,
            calls,
            config,
        } => {
            let config = load_config(config);
            let demo = Demo::record(
                config,
                DemoOptions {
                    draws,
                    one_time: true,
                },
            )?;
            let cmd = &demo.command_buffer;

            println!("Main stream ({} words):", cmd.stream().len());
            print!("{}", dump::dump(cmd.stream(), format)?);
            if format == DumpFormat::Json {
                println!();
            }
            println!();
            println!("After-submit stream ({} words):", cmd.after_stream().len());
            print!("{}", dump::dump(cmd.after_stream(), format)?);
            if format == DumpFormat::Json {
                println!();
            }

            let report = demo.replay()?;
            println!();
            println!("Replay:");
            println!("  Records:      {}", report.stats.records);
            println!("  GL calls:     {}", report.stats.calls);
            println!("  VAOs created: {}", report.stats.vaos_created);
            println!("  Uploads:      {}", report.stats.uploads);
            println!("  Readback:     {} bytes", report.readback.len());
            if calls {
                println!();
                for (i, call) in report.calls.iter().enumerate() {
                    println!("  {:>4}  {:?}", i, call);
                }
            }
        }

        Commands::Config { config } => {
            let config = load_config(config);
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
