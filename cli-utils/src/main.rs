//! Generate the provisioning blobs from a toml configfile.
//!
//! The output files are raw namespace blobs, ready to be written into the
//! node's non-volatile storage by whatever flashing tool the board uses.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use fieldnode_config::{NetworkIdentity, SystemConfig};
use serde::Deserialize;

/// Generate `system.bin` and `lorawan.bin` provisioning blobs from a TOML
/// configuration file.
#[derive(Parser)]
struct Opts {
    /// Path to a configuration file in TOML format.
    #[arg(short, long)]
    config: PathBuf,

    /// Directory the blobs are written to.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Deserialize)]
struct ConfigFile {
    system: SystemConfig,
    lorawan: NetworkIdentity,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    // Parse config
    let config_source = fs::read_to_string(&opts.config).context("Could not read config file")?;
    let config: ConfigFile =
        toml::from_str(&config_source).context("Could not parse config file")?;

    if !config.lorawan.is_provisioned() {
        println!("Warning: identity contains an all-zero DevEUI, the node will not join");
    }

    // Serialize blobs
    let system = config.system.serialize();
    let lorawan = config.lorawan.serialize();

    // Write output files
    fs::create_dir_all(&opts.out_dir).context("Could not create output directory")?;
    let system_path = opts.out_dir.join("system.bin");
    let lorawan_path = opts.out_dir.join("lorawan.bin");
    fs::write(&system_path, system).context("Could not write system blob")?;
    fs::write(&lorawan_path, lorawan).context("Could not write lorawan blob")?;

    println!("Wrote {} ({} bytes)", system_path.display(), system.len());
    println!("Wrote {} ({} bytes)", lorawan_path.display(), lorawan.len());

    Ok(())
}
