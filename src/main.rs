//! Slot Vault - an encrypted slot store on raw devices and image files.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slot_vault::config::{EraseConfig, VaultConfig, MAX_NAME_LEN, SLOT_SIZE, TOTAL_SLOTS};
use slot_vault::search::{find_by_name, search_content};
use slot_vault::{sync, Device, Error, Session, Vault};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

/// Environment variable consulted before prompting for a password.
const PASSWORD_ENV: &str = "SLOT_VAULT_PASSWORD";

#[derive(Parser)]
#[command(name = "slot-vault")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Encrypted slot store on raw devices and image files",
    long_about = "Hides up to 1000 encrypted files in fixed-size slots directly on a block device or image file, protected by a single password."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault, destroying previous contents
    Init {
        /// Block device or image file
        storage: PathBuf,

        /// Create a new image file instead of opening an existing one
        #[arg(long)]
        create: bool,

        /// Overwrite an existing vault
        #[arg(long)]
        force: bool,
    },

    /// Store a file in a slot
    Add {
        /// Block device or image file
        storage: PathBuf,

        /// Name recorded for the entry
        name: String,

        /// Input file to store
        #[arg(long, conflicts_with = "data")]
        input: Option<PathBuf>,

        /// String data to store
        #[arg(long, conflicts_with = "input")]
        data: Option<String>,

        /// Slot index (default: first free slot)
        #[arg(long, allow_hyphen_values = true)]
        index: Option<i64>,
    },

    /// Read a slot
    Get {
        /// Block device or image file
        storage: PathBuf,

        /// Slot index
        #[arg(allow_hyphen_values = true)]
        index: i64,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Wipe a slot and remove its entry
    Rm {
        /// Block device or image file
        storage: PathBuf,

        /// Slot index
        #[arg(allow_hyphen_values = true)]
        index: i64,
    },

    /// List occupied slots
    Ls {
        /// Block device or image file
        storage: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Find entries by name (case-insensitive substring)
    Find {
        /// Block device or image file
        storage: PathBuf,

        /// Name fragment
        pattern: String,
    },

    /// Find entries whose content contains a string
    Grep {
        /// Block device or image file
        storage: PathBuf,

        /// Content fragment
        needle: String,
    },

    /// Copy every occupied slot and the registry to another storage
    Sync {
        /// Source block device or image file
        source: PathBuf,

        /// Destination block device or image file
        destination: PathBuf,
    },

    /// Zero-fill the storage
    Erase {
        /// Block device or image file
        storage: PathBuf,

        /// First byte to erase
        #[arg(long, default_value = "0")]
        start: u64,

        /// End of the range (default: end of storage)
        #[arg(long)]
        end: Option<u64>,

        /// Bytes written per chunk
        #[arg(long, default_value = "1048576")]
        chunk_size: usize,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show vault header and usage
    Info {
        /// Block device or image file
        storage: PathBuf,
    },
}

fn main() {
    // Warnings only unless RUST_LOG says otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slot_vault=warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init {
            storage,
            create,
            force,
        } => cmd_init(&storage, create, force),

        Commands::Add {
            storage,
            name,
            input,
            data,
            index,
        } => cmd_add(&storage, &name, input, data, index),

        Commands::Get {
            storage,
            index,
            output,
        } => cmd_get(&storage, index, output),

        Commands::Rm { storage, index } => cmd_rm(&storage, index),

        Commands::Ls { storage, json } => cmd_ls(&storage, json),

        Commands::Find { storage, pattern } => cmd_find(&storage, &pattern),

        Commands::Grep { storage, needle } => cmd_grep(&storage, &needle),

        Commands::Sync {
            source,
            destination,
        } => cmd_sync(&source, &destination),

        Commands::Erase {
            storage,
            start,
            end,
            chunk_size,
            force,
        } => cmd_erase(&storage, start, end, chunk_size, force),

        Commands::Info { storage } => cmd_info(&storage),
    }
}

fn prompt_password(prompt: &str) -> anyhow::Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }

    // Piped input has no terminal to disable echo on.
    if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
        return Ok(Zeroizing::new(rpassword::prompt_password(prompt)?));
    }

    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut password = Zeroizing::new(String::new());
    io::stdin().read_line(&mut password)?;
    Ok(Zeroizing::new(
        password.trim_end_matches(['\r', '\n']).to_string(),
    ))
}

fn open_session() -> anyhow::Result<Session> {
    let password = prompt_password("Password: ")?;
    Ok(Session::new(&password)?)
}

fn open_vault(path: &Path) -> anyhow::Result<Vault<Device>> {
    let device =
        Device::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Vault::new(device))
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn cmd_init(path: &Path, create: bool, force: bool) -> anyhow::Result<()> {
    let mut vault = if create {
        let device = Device::create(path, 0)
            .with_context(|| format!("cannot create {}", path.display()))?;
        Vault::new(device)
    } else {
        open_vault(path)?
    };

    // Anything but a blank storage needs --force, including damaged vaults.
    if !force && !matches!(vault.inspect(), Err(Error::NotInitialized)) {
        bail!(
            "{} already holds a vault; pass --force to replace it",
            path.display()
        );
    }

    let password = prompt_password("Enter password: ")?;
    let confirmation = prompt_password("Confirm password: ")?;
    if *password != *confirmation {
        bail!("Passwords do not match");
    }

    let mut session = Session::new(&password)?;
    vault.initialize(&mut session)?;
    session.clear();

    println!("Vault initialized on {}", path.display());
    println!("  Slots:          {}", TOTAL_SLOTS);
    println!("  Slot size:      {} bytes", SLOT_SIZE);
    println!("  Max name:       {} bytes", MAX_NAME_LEN);
    if vault.storage().is_raw_device()? {
        println!("  Note: raw device slots were not zeroed; run `erase` first to scrub them");
    }

    Ok(())
}

fn cmd_add(
    path: &Path,
    name: &str,
    input: Option<PathBuf>,
    data: Option<String>,
    index: Option<i64>,
) -> anyhow::Result<()> {
    let content = Zeroizing::new(match (input, data) {
        (Some(file), None) => {
            std::fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?
        }
        (None, Some(s)) => s.into_bytes(),
        (None, None) => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
        (Some(_), Some(_)) => bail!("--input and --data are mutually exclusive"),
    });

    let mut vault = open_vault(path)?;
    let mut session = open_session()?;
    let slot = vault.add(&mut session, &content, name, index)?;
    session.clear();

    println!("Stored {} bytes in slot {}", content.len(), slot);
    Ok(())
}

fn cmd_get(path: &Path, index: i64, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut vault = open_vault(path)?;
    let mut session = open_session()?;

    match output {
        Some(file) => {
            let mut out = std::fs::File::create(&file)
                .with_context(|| format!("cannot create {}", file.display()))?;
            let len = vault.get(&mut session, index, &mut out)?;
            eprintln!("Wrote {} bytes to {}", len, file.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            vault.get(&mut session, index, &mut out)?;
        }
    }

    session.clear();
    Ok(())
}

fn cmd_rm(path: &Path, index: i64) -> anyhow::Result<()> {
    let mut vault = open_vault(path)?;
    let mut session = open_session()?;
    vault.delete(&mut session, index)?;
    session.clear();

    println!("Wiped slot {}", index);
    Ok(())
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    index: usize,
    name: &'a str,
    size: u32,
}

fn cmd_ls(path: &Path, json: bool) -> anyhow::Result<()> {
    let mut vault = open_vault(path)?;
    let mut session = open_session()?;
    let registry = vault.load(&mut session)?;
    session.clear();

    let entries: Vec<ListedEntry> = registry
        .occupied()
        .map(|(index, entry)| ListedEntry {
            index: index.get(),
            name: &entry.name,
            size: entry.size,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("(empty)");
    } else {
        for entry in entries {
            println!("{:>4} {:>10}  {}", entry.index, entry.size, entry.name);
        }
    }

    Ok(())
}

fn cmd_find(path: &Path, pattern: &str) -> anyhow::Result<()> {
    let mut vault = open_vault(path)?;
    let mut session = open_session()?;
    let registry = vault.load(&mut session)?;
    session.clear();

    for (index, entry) in find_by_name(&registry, pattern) {
        println!("{:>4}  {}", index, entry.name);
    }
    Ok(())
}

fn cmd_grep(path: &Path, needle: &str) -> anyhow::Result<()> {
    let mut vault = open_vault(path)?;
    let mut session = open_session()?;
    let matches = search_content(&mut vault, &mut session, needle.as_bytes())?;
    let registry = vault.load(&mut session)?;
    session.clear();

    for index in matches {
        let name = registry.get(index).map(|e| e.name.as_str()).unwrap_or("?");
        println!("{:>4}  {}", index, name);
    }
    Ok(())
}

fn cmd_sync(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let mut source_vault = open_vault(source)?;
    let mut destination_vault = open_vault(destination)?;
    let mut session = open_session()?;
    let copied = sync(&mut source_vault, &mut destination_vault, &mut session)?;
    session.clear();

    println!(
        "Copied {} slots from {} to {}",
        copied.len(),
        source.display(),
        destination.display()
    );
    Ok(())
}

fn cmd_erase(
    path: &Path,
    start: u64,
    end: Option<u64>,
    chunk_size: usize,
    force: bool,
) -> anyhow::Result<()> {
    if !force && !confirm("This will permanently destroy all data in range. Continue?")? {
        println!("Aborted");
        return Ok(());
    }

    let defaults = EraseConfig::default();
    let config = VaultConfig {
        erase: EraseConfig::new(chunk_size, defaults.slow_write_threshold, defaults.pause),
    };
    let device = Device::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut vault = Vault::with_config(device, config)?;

    let report = vault.erase_range(start, end)?;

    if report.truncated {
        println!("Truncated {}", path.display());
    } else {
        println!("Zeroed {} bytes", report.bytes_zeroed);
        if report.reached_device_end {
            println!("Reached end of device");
        }
        if report.pauses > 0 {
            println!("Paused {} times for slow writes", report.pauses);
        }
    }
    Ok(())
}

fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let mut vault = open_vault(path)?;
    let header = vault.inspect()?;

    println!("Slot Vault Information");
    println!("======================");
    println!("Storage:          {}", path.display());
    println!("Format version:   {}", header.version);
    println!("Salt:             {}", hex::encode(header.salt));
    println!("Registry size:    {} bytes (encrypted)", header.ciphertext_len);
    println!("Checksum:         {}", hex::encode(header.checksum));

    let mut session = open_session()?;
    let registry = vault.load(&mut session)?;
    session.clear();

    println!();
    println!("Slots:");
    println!("  Total:          {}", registry.capacity());
    println!("  Used:           {}", registry.occupied_count());
    println!("  Free:           {}", registry.free_count());

    Ok(())
}
