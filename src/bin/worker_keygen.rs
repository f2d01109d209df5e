//! Generate an Ed25519 worker key pair
//!
//! Writes the private seed to `<name>` and the public key to `<name>.pub`,
//! both hex encoded. With `--key-list` the public key is also appended to
//! the coordinator's key list file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use fedlink_core::auth::{KeyStore, WorkerKeyPair};

#[derive(Parser, Debug)]
#[command(name = "worker_keygen", about = "Generate a worker key pair")]
struct Args {
    /// Output path for the private seed; the public key goes to `<name>.pub`
    name: PathBuf,

    /// Key list file to append the public key to
    #[arg(long)]
    key_list: Option<PathBuf>,

    /// Overwrite existing key files
    #[arg(long)]
    force: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut pub_path = args.name.clone().into_os_string();
    pub_path.push(".pub");
    let pub_path = PathBuf::from(pub_path);

    if !args.force && (args.name.exists() || pub_path.exists()) {
        return Err(format!(
            "{} or {} already exists (use --force to overwrite)",
            args.name.display(),
            pub_path.display()
        )
        .into());
    }

    let key = WorkerKeyPair::generate();
    let public_hex = key.public_key_hex();

    std::fs::write(&args.name, format!("{}\n", key.seed_hex()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&args.name, std::fs::Permissions::from_mode(0o600))?;
    }
    std::fs::write(&pub_path, format!("{}\n", public_hex))?;

    println!("Private key: {}", args.name.display());
    println!("Public key:  {} ({})", pub_path.display(), public_hex);

    if let Some(list) = args.key_list {
        if list.exists() && KeyStore::load(&list)?.contains(&public_hex) {
            println!("{} already lists this key", list.display());
        } else {
            let needs_newline = std::fs::read(&list)
                .map(|b| !b.is_empty() && !b.ends_with(b"\n"))
                .unwrap_or(false);
            let mut file = OpenOptions::new().create(true).append(true).open(&list)?;
            if needs_newline {
                writeln!(file)?;
            }
            writeln!(file, "{}", public_hex)?;
            println!("Appended to {}", list.display());
        }
    }

    Ok(())
}
