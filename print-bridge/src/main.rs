use anyhow::Context;
use clap::{Parser, Subcommand};
use pos_printer::{
    BluetoothTransport, DrawerPin, HriPosition, LanTransport, QrErrorCorrection, Symbology,
    UnavailableRadio, UnavailableUsbHost, UsbTransport,
};
use print_bridge::{Config, PrintHandler, PrintService, ProfileStore, logger};
use shared::{PrintResult, ReceiptKind, SaleRecord, TransportType};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "print-bridge", about = "Receipt printing bench tool", version)]
struct Cli {
    /// Preferred transport (bluetooth, usb, lan, vendor-sdk-a, ...)
    #[arg(short, long, global = true)]
    transport: Option<TransportType>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print plain text (stdin when no file)
    Text { file: Option<PathBuf> },
    /// Print HTML, converted to receipt text (stdin when no file)
    Html { file: Option<PathBuf> },
    /// Print a barcode
    Barcode {
        data: String,
        /// Symbology name (CODE128, EAN13, UPC-A, ...)
        #[arg(short, long, default_value = "CODE128")]
        symbology: String,
        /// Bar height in dots
        #[arg(long, default_value_t = 162)]
        height: i32,
        /// Module width (2-6)
        #[arg(long, default_value_t = 3)]
        width: i32,
        /// HRI position code (0 none, 1 above, 2 below, 3 both)
        #[arg(long, default_value_t = 2)]
        hri: i32,
    },
    /// Print a QR code
    Qr {
        data: String,
        /// Module size (1-16)
        #[arg(long, default_value_t = 6)]
        size: i32,
        /// Error correction level (L, M, Q, H)
        #[arg(long, default_value = "L")]
        level: String,
    },
    /// Print a JSON sale record
    Receipt {
        file: PathBuf,
        #[arg(short, long, default_value = "receipt")]
        kind: ReceiptKind,
    },
    /// Pulse the cash drawer
    Drawer {
        /// Use the pin 5 connector instead of pin 2
        #[arg(long)]
        pin5: bool,
    },
    /// List printer profiles as JSON
    Profiles,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Cannot create {}", config.work_dir.display()))?;
    let store = ProfileStore::open(config.db_path())
        .with_context(|| format!("Cannot open {}", config.db_path().display()))?;

    if let Command::Profiles = cli.command {
        println!("{}", serde_json::to_string_pretty(&store.get_all()?)?);
        return Ok(());
    }

    let handler = PrintHandler::new(store, config.handler_options())
        .with_transport(Arc::new(LanTransport::new()))
        .with_transport(Arc::new(BluetoothTransport::new(Arc::new(UnavailableRadio))))
        .with_transport(Arc::new(UsbTransport::new(Arc::new(UnavailableUsbHost))));
    let service = PrintService::new(handler);
    let preferred = cli.transport;

    tracing::debug!(?preferred, "print-bridge starting");

    let result = match cli.command {
        Command::Text { file } => service.print(read_input(file.as_deref())?, preferred).await,
        Command::Html { file } => {
            service
                .print_html(read_input(file.as_deref())?, preferred)
                .await
        }
        Command::Barcode {
            data,
            symbology,
            height,
            width,
            hri,
        } => {
            service
                .print_barcode(
                    data,
                    Symbology::from_name(&symbology),
                    height,
                    width,
                    HriPosition::from_code(hri),
                    preferred,
                )
                .await
        }
        Command::Qr { data, size, level } => {
            service
                .print_qr_code(data, size, QrErrorCorrection::from_name(&level), preferred)
                .await
        }
        Command::Receipt { file, kind } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let record: SaleRecord = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid sale record in {}", file.display()))?;
            service.print_receipt(record, kind, preferred).await
        }
        Command::Drawer { pin5 } => {
            let pin = if pin5 { DrawerPin::Pin5 } else { DrawerPin::Pin2 };
            service.open_cash_drawer(pin, preferred).await
        }
        Command::Profiles => PrintResult::ok(""),
    };

    println!("{}", result.to_json());
    if !result.success {
        process::exit(1);
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Cannot read stdin")?;
            Ok(buf)
        }
    }
}
