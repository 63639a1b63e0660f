//! # printbridge CLI
//!
//! Command-line front end for the Bluetooth printer bridge.
//!
//! ## Usage
//!
//! ```bash
//! # List paired devices as name#address
//! printbridge devices
//!
//! # Send a file of raw printer commands
//! printbridge print --address 00:11:62:AA:BB:CC receipt.bin
//!
//! # Make one method call and print the JSON response
//! printbridge call CONNECTION_STATUS
//!
//! # Serve the method channel over HTTP
//! printbridge serve --listen 127.0.0.1:8090
//!
//! # Use a device bound with `rfcomm bind` instead of a raw socket
//! printbridge --link tty print --address 00:11:62:AA:BB:CC receipt.bin
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `printbridge=info`).

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use printbridge::{
    BridgeError,
    channel::{Bridge, Method, MethodCall},
    config::{BridgeConfig, DEFAULT_LISTEN_ADDR, LinkMode},
    permission::{Permission, PermissionModel},
    platform::platform_version,
    server,
    transport::RFCOMM_DEFAULT_CHANNEL,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// printbridge - Bluetooth thermal printer bridge
#[derive(Parser, Debug)]
#[command(name = "printbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// How to reach the printer: socket or tty
    #[arg(long, global = true, default_value_t = LinkMode::Socket)]
    link: LinkMode,

    /// RFCOMM channel for socket links
    #[arg(long, global = true, default_value_t = RFCOMM_DEFAULT_CHANNEL)]
    channel: u8,

    /// Enforce the single legacy BLUETOOTH permission instead of CONNECT + SCAN
    #[arg(long, global = true)]
    legacy_permissions: bool,

    /// Restrict granted permissions (repeatable); all are granted when omitted
    #[arg(long = "grant", global = true, value_name = "PERMISSION")]
    granted: Vec<Permission>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List paired Bluetooth devices
    Devices,

    /// Connect, send raw bytes, and disconnect
    Print {
        /// Printer Bluetooth address
        #[arg(long)]
        address: String,

        /// File of raw bytes to send (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Make a single method call and print the JSON response
    Call {
        /// Method name (e.g. GET_PAIRED_DEVICES)
        method: String,

        /// Arguments as a JSON object
        arguments: Option<String>,
    },

    /// Serve the method channel over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
        listen: String,
    },

    /// Print the platform version string
    Version,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("printbridge=info")))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), BridgeError> {
    let cli = Cli::parse();

    let config = BridgeConfig {
        link: cli.link,
        channel: cli.channel,
        permission_model: if cli.legacy_permissions {
            PermissionModel::Legacy
        } else {
            PermissionModel::Modern
        },
        granted: (!cli.granted.is_empty()).then_some(cli.granted),
        ..BridgeConfig::default()
    };

    match cli.command {
        Commands::Devices => {
            let manager = config.build_manager();
            for device in manager.list_paired_devices()? {
                println!("{}", device);
            }
        }

        Commands::Print { address, file } => {
            let data = read_input(file.as_ref())?;
            let manager = config.build_manager();
            manager.connect(&address)?;

            let printed = manager.write(&data);
            manager.disconnect()?;

            if !printed {
                let reason = manager
                    .last_failure()
                    .unwrap_or_else(|| "write failed".to_string());
                return Err(BridgeError::Transport(reason));
            }
            println!("Printed {} bytes to {}", data.len(), address);
        }

        Commands::Call { method, arguments } => {
            if method.parse::<Method>().is_err() {
                let known: Vec<&str> = Method::ALL.iter().map(Method::as_str).collect();
                eprintln!("Known methods: {}", known.join(", "));
            }
            let arguments = match arguments {
                Some(raw) => serde_json::from_str(&raw).map_err(std::io::Error::from)?,
                None => serde_json::Value::Null,
            };

            let bridge = Bridge::new(Arc::new(config.build_manager()));
            let runtime = tokio::runtime::Runtime::new()?;
            let response = runtime.block_on(async {
                let response = bridge.handle(MethodCall::new(method, arguments)).await;
                bridge.shutdown().await;
                response
            });

            let json = serde_json::to_string_pretty(&response).map_err(std::io::Error::from)?;
            println!("{}", json);
        }

        Commands::Serve { listen } => {
            let config = BridgeConfig {
                listen_addr: listen,
                ..config
            };
            let bridge = Bridge::new(Arc::new(config.build_manager()));
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(&config.listen_addr, bridge))?;
        }

        Commands::Version => {
            println!("{}", platform_version());
        }
    }

    Ok(())
}

/// Read the print payload from a file or stdin.
fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>, BridgeError> {
    match file {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}
