use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use smnflow::common::{cpu, pci, Pci, PciTopology, ProbePci};
use smnflow::smn::{BusResolver, IndirectRegisterPort, NamedWindowResolver, DEFAULT_BUS};
use smnflow::{PlatformConfig, WindowStore};
use smnflow_raw::current_arch::thm::{self, ThmTconCurTmp};

#[derive(Parser, Debug)]
#[command(name = "smnflow")]
#[command(about = "Read and write AMD SMN registers through the root complex index/data pair")]
struct Args {
    #[arg(
        long,
        global = true,
        help = "Platform config (JSON) with SMN windows and devices; built-in table if omitted"
    )]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Enable verbose logging (shows every SMN transaction)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the SMN register at BASE + OFFSET
    Read {
        #[arg(value_parser = parse_number)]
        base: u32,
        #[arg(value_parser = parse_number)]
        offset: u32,
        #[arg(long, value_parser = parse_number, help = "Root complex bus (default 0)")]
        bus: Option<u32>,
    },

    /// Write VALUE to the SMN register at BASE + OFFSET
    Write {
        #[arg(value_parser = parse_number)]
        base: u32,
        #[arg(value_parser = parse_number)]
        offset: u32,
        #[arg(value_parser = parse_number)]
        value: u32,
        #[arg(long, value_parser = parse_number, help = "Root complex bus (default 0)")]
        bus: Option<u32>,
    },

    /// Read register OFFSET of SMN window NAME
    BarRead {
        name: String,
        #[arg(value_parser = parse_number)]
        offset: u32,
        #[arg(long, value_parser = parse_number, help = "Root complex bus (default 0)")]
        bus: Option<u32>,
    },

    /// Write VALUE to register OFFSET of SMN window NAME
    BarWrite {
        name: String,
        #[arg(value_parser = parse_number)]
        offset: u32,
        #[arg(value_parser = parse_number)]
        value: u32,
        #[arg(long, value_parser = parse_number, help = "Root complex bus (default 0)")]
        bus: Option<u32>,
    },

    /// Print the base address of SMN window NAME (-1 if unconfigured)
    BarBase { name: String },

    /// Print the root complex bus serving a CPU thread (all online threads if omitted)
    Bus { thread: Option<u32> },

    /// List the SMN windows of the platform config
    Windows,

    /// Read and decode the current control temperature (Tctl)
    Temp {
        #[arg(long, value_parser = parse_number, help = "Root complex bus (default 0)")]
        bus: Option<u32>,
    },
}

/// Parse "0x"-prefixed hex or decimal into 32 bits
fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid 32-bit number {s:?}: {e}"))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PlatformConfig> {
    match path {
        Some(path) => PlatformConfig::load(path)
            .with_context(|| format!("failed to load platform config {}", path.display())),
        None => Ok(PlatformConfig::builtin()),
    }
}

/// Root complex bus a command accesses, `None` when it needs no write access
///
/// `bus` only reads vendor ids while scanning, so it runs unprivileged.
fn hardware_bus(command: &Command) -> Option<u32> {
    match command {
        Command::Read { bus, .. }
        | Command::Write { bus, .. }
        | Command::BarRead { bus, .. }
        | Command::BarWrite { bus, .. }
        | Command::Temp { bus } => Some(bus.unwrap_or(DEFAULT_BUS)),
        Command::BarBase { .. } | Command::Bus { .. } | Command::Windows => None,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging based on verbose flag, RUST_LOG takes precedence
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_ref())?;

    if let Some(bus) = hardware_bus(&args.command) {
        pci::check_access(bus).with_context(|| {
            format!("cannot open the root complex on bus 0x{bus:02X} read/write (run as root)")
        })?;
    }

    let port = IndirectRegisterPort::new(Pci::instance());
    let resolver = NamedWindowResolver::new(&config, port);

    match args.command {
        Command::Read { base, offset, bus } => {
            let value = resolver.port().read(base, offset, bus)?;
            println!("0x{value:08X}");
        }
        Command::Write {
            base,
            offset,
            value,
            bus,
        } => {
            resolver.port().write(base, offset, value, bus)?;
            tracing::info!("Wrote 0x{:08X} to 0x{:08X} + 0x{:08X}", value, base, offset);
        }
        Command::BarRead { name, offset, bus } => {
            let value = resolver.read(&name, offset, bus)?;
            println!("0x{value:08X}");
        }
        Command::BarWrite {
            name,
            offset,
            value,
            bus,
        } => {
            resolver.write(&name, offset, value, bus)?;
            tracing::info!("Wrote 0x{:08X} to {} + 0x{:08X}", value, name, offset);
        }
        Command::BarBase { name } => {
            println!("{}", resolver.resolve_base(&name)?);
        }
        Command::Bus { thread } => {
            let topology = PciTopology::new(&config, ProbePci);
            let buses = BusResolver::new(&topology);
            let threads = match thread {
                Some(thread) => vec![thread],
                None => cpu::online_cpus(),
            };
            for thread in threads {
                println!("cpu{thread}: bus 0x{:02X}", buses.bus_from_cpu_thread(thread)?);
            }
        }
        Command::Windows => {
            for name in config.window_names() {
                match config.window(name) {
                    Some(window) => println!(
                        "{name:<16} {:<12} {}",
                        window.fixed_address().ok().flatten().unwrap_or("-"),
                        window.description().unwrap_or("")
                    ),
                    None => println!("{name:<16} -"),
                }
            }
        }
        Command::Temp { bus } => {
            let mut reg = thm::cur_tmp_register();
            if !resolver.resolve_base(reg.window)?.is_resolved() {
                bail!("SMN window {} is not configured", reg.window);
            }
            let value = resolver.read(reg.window, reg.offset, bus)?;
            reg.load(value);
            let ThmTconCurTmp {
                range_select,
                cur_temp,
            } = reg.layout;
            tracing::debug!(
                "THM_TCON_CUR_TMP = 0x{:08X} (cur_temp {}, range_select {})",
                reg.to_raw(),
                cur_temp,
                range_select
            );
            println!("Tctl: {:.3} C", reg.layout.celsius());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0x3B100000"), Ok(0x3B10_0000));
        assert_eq!(parse_number("100"), Ok(100));
        assert_eq!(parse_number("0XFF"), Ok(0xFF));
        assert!(parse_number("0x1_0000_0000").is_err());
        assert!(parse_number("-1").is_err());
    }

    #[test]
    fn test_cli_parses_bar_read() {
        let args = Args::try_parse_from(["smnflow", "bar-read", "SMUTHM", "0x0", "--bus", "0x40"])
            .unwrap();
        match args.command {
            Command::BarRead { name, offset, bus } => {
                assert_eq!(name, "SMUTHM");
                assert_eq!(offset, 0);
                assert_eq!(bus, Some(0x40));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_offline_commands_skip_access_check() {
        assert_eq!(hardware_bus(&Command::Windows), None);
        assert_eq!(
            hardware_bus(&Command::BarBase {
                name: "SMUTHM".to_string()
            }),
            None
        );
        assert_eq!(hardware_bus(&Command::Bus { thread: Some(0) }), None);
    }

    #[test]
    fn test_access_check_uses_target_bus() {
        assert_eq!(hardware_bus(&Command::Temp { bus: None }), Some(DEFAULT_BUS));
        assert_eq!(hardware_bus(&Command::Temp { bus: Some(0x40) }), Some(0x40));

        let args = Args::try_parse_from(["smnflow", "write", "0x59800", "0x4", "1", "--bus", "0x80"])
            .unwrap();
        assert_eq!(hardware_bus(&args.command), Some(0x80));
    }
}
