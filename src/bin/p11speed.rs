use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use p11speed::api::{Algorithm, Pin, SlotId};
use p11speed::{BenchmarkConfig, FailurePolicy, SpeedError};

#[derive(Parser, Debug)]
#[command(name = "p11speed")]
#[command(about = "Measure the signing throughput of a PKCS#11 module", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// PKCS#11 library to load
    #[arg(
        long,
        global = true,
        env = "P11SPEED_MODULE",
        default_value = "/usr/local/lib/softhsm/libsofthsm2.so"
    )]
    pub module: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display the available slots and their tokens
    ShowSlots,

    /// Generate a key pair and time concurrent signing with it
    Sign {
        /// Slot holding the token
        #[arg(long, env = "P11SPEED_SLOT")]
        slot: Option<u64>,

        /// User PIN; prompted for when absent
        #[arg(long, env = "P11SPEED_PIN", hide_env_values = true)]
        pin: Option<String>,

        /// Signing mechanism (RSA_PKCS, DSA, ECDSA or GOSTR3410)
        #[arg(long)]
        mechanism: Option<String>,

        /// Key size in bits (RSA and DSA 1024-4096, ECDSA 256 or 384; ignored for GOSTR3410)
        #[arg(long)]
        keysize: Option<u32>,

        /// Number of signing threads
        #[arg(long)]
        threads: Option<usize>,

        /// Signatures per thread
        #[arg(long)]
        iterations: Option<u64>,

        /// Fail the run when any thread stops early
        #[arg(long)]
        strict: bool,
    },
}

fn prompt_pin() -> anyhow::Result<Pin> {
    let entered = rpassword::prompt_password("User PIN: ").context("failed to read the PIN")?;
    Pin::from_str(&entered).context("invalid PIN")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::ShowSlots => {
            let mut stdout = io::stdout().lock();
            p11speed::list_slots(&cli.module, &mut stdout)
                .with_context(|| format!("failed to list slots of {}", cli.module.display()))?;
        }

        Commands::Sign {
            slot,
            pin,
            mechanism,
            keysize,
            threads,
            iterations,
            strict,
        } => {
            let slot = slot
                .map(SlotId::try_from)
                .transpose()
                .map_err(SpeedError::from)?;
            let algorithm = mechanism
                .map(|name| name.parse::<Algorithm>())
                .transpose()
                .map_err(SpeedError::from)?;
            let pin = pin
                .map(|pin| Pin::from_str(&pin))
                .transpose()
                .context("invalid PIN")?;

            let mut config = BenchmarkConfig {
                slot,
                pin,
                algorithm,
                key_size: keysize,
                threads,
                iterations,
                failure_policy: if strict {
                    FailurePolicy::Strict
                } else {
                    FailurePolicy::Lenient
                },
            };

            if config.pin.is_none() {
                config.check_parameters()?;
                config.pin = Some(prompt_pin()?);
            }

            let result = p11speed::sign_benchmark(&cli.module, &config)
                .with_context(|| format!("benchmark against {} failed", cli.module.display()))?;
            println!("{}", result);
        }
    }

    Ok(())
}
