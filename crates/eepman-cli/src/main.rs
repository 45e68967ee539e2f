//! Command-line front end for the eepman replicated EEPROM configuration
//! store (spec `6. EXTERNAL INTERFACES`).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eepman_core::{EepmanError, Store, VerifyOutcome, DEFAULT_CONFIG_PATH};

/// Reads and writes string-keyed configuration values replicated across a
/// pool of EEPROM-backed devices.
#[derive(Debug, Parser)]
#[command(name = "eepman")]
#[command(about = "Replicated EEPROM configuration store")]
struct Cli {
    /// Path to the replica configuration file.
    #[arg(long, default_value_t = DEFAULT_CONFIG_PATH.to_string())]
    config: String,

    /// Suppress non-error output.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Emit `key="value"` pairs instead of bare values.
    #[arg(short = 'b', long)]
    labelled: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the value of one or more keys.
    Read {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Set one or more key/value pairs.
    Set {
        /// Refuse to create a key that does not already exist.
        #[arg(short = 'n', long)]
        no_create: bool,
        /// `KEY VALUE` pairs, e.g. `set serial A1B2 model X9`.
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Remove a key.
    Remove { key: String },
    /// Print every key and its value.
    All,
    /// Reset the document to `{}` on every replica.
    Clear,
    /// Re-verify and repair the replica pool.
    Verify,
    /// Print the configured replica pool.
    Info,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("eepman: {e}");
            }
            exit_code_for(&e)
        }
    }
}

fn run(cli: &Cli) -> eepman_core::Result<()> {
    let store = Store::new(cli.config.as_str());
    store.initialise()?;

    match &cli.command {
        Command::Read { keys } => {
            for key in keys {
                let value = store.get(key)?;
                print_entry(cli, key, &value);
            }
        }
        Command::Set { no_create, pairs } => {
            if pairs.len() % 2 != 0 {
                return Err(EepmanError::Invalid(
                    "set requires an even number of KEY VALUE arguments".into(),
                ));
            }
            for pair in pairs.chunks(2) {
                store.set(&pair[0], Some(pair[1].as_str()), *no_create)?;
            }
        }
        Command::Remove { key } => store.remove(key)?,
        Command::All => {
            let mut keys = store.keys()?;
            keys.sort();
            for key in keys {
                let value = store.get(&key)?;
                print_entry(cli, &key, &value);
            }
        }
        Command::Clear => store.clear()?,
        Command::Verify => {
            let outcome = store.verify()?;
            if !cli.quiet {
                match outcome {
                    VerifyOutcome::AllGood => println!("all replicas verified"),
                    VerifyOutcome::Repaired => println!("one or more replicas were repaired"),
                    VerifyOutcome::Unverifiable => println!("pool is unverifiable"),
                }
            }
        }
        Command::Info => {
            for replica in store.info()? {
                println!(
                    "{}  block_size={}  block_count={}  total_bytes={}",
                    replica.path.display(),
                    replica.block_size,
                    replica.block_count,
                    replica.total_bytes,
                );
            }
        }
    }

    Ok(())
}

fn print_entry(cli: &Cli, key: &str, value: &str) {
    if cli.quiet {
        return;
    }
    if cli.labelled {
        println!("{key}=\"{value}\"");
    } else {
        println!("{value}");
    }
}

/// Maps a taxonomy variant to the process exit code of spec `6`/`7`.
///
/// `EepmanError::exit_code()` returns the stable negative integer from the
/// taxonomy; process exit codes are a single byte, so the negative value is
/// truncated the same way a C `return -1;` becomes exit status 255.
fn exit_code_for(error: &EepmanError) -> ExitCode {
    ExitCode::from(error.exit_code() as u8)
}
