//! Dpac CLI
//!
//! Command-line tooling for Dpac archives: pack a directory tree, list and
//! inspect an archive, and extract entries back out.

mod utils;

use clap::{Parser, Subcommand};
use dpac_archive::{ArchiveReader, ArchiveWriter};
use dpac_core::file::{FileReadStream, FileWriteStream};
use dpac_core::stream::{ReadStream, WriteStream};
use std::io::Write;
use std::path::{Path, PathBuf};
use utils::{collect_files, create_progress_bar, print_entries, sanitize_entry_path};

#[derive(Parser)]
#[command(name = "dpac")]
#[command(author, version, about = "Dpac archive utility")]
#[command(long_about = "
Dpac packs a directory tree into a single offset-indexed archive file and
reads entries back out by name.

Examples:
  dpac pack assets.dpac ./assets
  dpac list assets.dpac
  dpac list assets.dpac --json
  dpac extract assets.dpac /textures/grass.png > grass.png
  dpac unpack assets.dpac -o ./out
  dpac info assets.dpac
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a directory tree into a new archive
    #[command(alias = "p")]
    Pack {
        /// Output archive file
        archive: PathBuf,

        /// Directory to pack
        dir: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long, default_value = "true")]
        progress: bool,
    },

    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Stream one entry's bytes to stdout
    #[command(alias = "x")]
    Extract {
        /// Archive file to read
        archive: PathBuf,

        /// Entry name to extract
        entry: String,
    },

    /// Unpack entries into a directory
    #[command(alias = "u")]
    Unpack {
        /// Archive file to unpack
        archive: PathBuf,

        /// Entries to unpack (all if empty)
        entries: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long, default_value = "true")]
        progress: bool,
    },

    /// Show information about an archive
    #[command(alias = "i")]
    Info {
        /// Archive file to inspect
        archive: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pack {
            archive,
            dir,
            verbose,
            progress,
        } => cmd_pack(&archive, &dir, verbose, progress),
        Commands::List {
            archive,
            verbose,
            json,
        } => cmd_list(&archive, verbose, json),
        Commands::Extract { archive, entry } => cmd_extract(&archive, &entry),
        Commands::Unpack {
            archive,
            entries,
            output,
            verbose,
            progress,
        } => cmd_unpack(&archive, &entries, &output, verbose, progress),
        Commands::Info { archive } => cmd_info(&archive),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_pack(
    archive: &Path,
    dir: &Path,
    verbose: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = collect_files(dir)?;

    let mut writer = ArchiveWriter::create(archive)?;
    writer.reserve_entries(sources.len())?;
    for (name, _, size) in &sources {
        writer.declare_entry(name, *size)?;
    }
    writer.finalize()?;

    let pb = create_progress_bar(sources.len() as u64, progress && !verbose);
    for (name, path, _) in &sources {
        let mut source = FileReadStream::open(path)?;
        let transfer = writer.populate_entry(name, &mut source)?;
        if verbose {
            println!("  added {} ({} bytes)", name, transfer.bytes_written);
        }
        pb.inc(1);
    }
    writer.close()?;
    pb.finish_and_clear();

    println!(
        "Packed {} entries from {} into {}",
        sources.len(),
        dir.display(),
        archive.display()
    );
    Ok(())
}

fn cmd_list(archive: &Path, verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let reader = ArchiveReader::open(archive)?;

    if json {
        let doc = serde_json::json!({
            "archive": archive.display().to_string(),
            "file_size": reader.file_size(),
            "heap_start": reader.heap_start(),
            "entries": reader.entries(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Archive: {}", archive.display());
    println!();
    print_entries(reader.entries(), verbose);
    Ok(())
}

fn cmd_extract(archive: &Path, entry: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reader = ArchiveReader::open(archive)?;
    let mut source = reader.entry_stream(entry)?;

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    let mut chunk = [0u8; 32 * 1024];
    loop {
        let read = source.read_into(&mut chunk)?;
        if read == 0 {
            break;
        }
        stdout.write_all(&chunk[..read])?;
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_unpack(
    archive: &Path,
    entries: &[String],
    output: &Path,
    verbose: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = ArchiveReader::open(archive)?;

    let names: Vec<String> = if entries.is_empty() {
        reader.entries().iter().map(|e| e.name.clone()).collect()
    } else {
        // Fail before writing anything if any requested entry is missing.
        for name in entries {
            reader.entry(name)?;
        }
        entries.to_vec()
    };

    let pb = create_progress_bar(names.len() as u64, progress && !verbose);
    let mut unpacked = 0usize;
    for name in &names {
        let Some(relative) = sanitize_entry_path(name) else {
            eprintln!("  skipping unsafe entry name: {}", name);
            pb.inc(1);
            continue;
        };
        let dest = output.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut source = reader.entry_stream(name)?;
        let mut sink = FileWriteStream::create(&dest)?;
        let transfer = sink.drain_from(&mut source)?;
        sink.flush()?;
        if verbose {
            println!("  wrote {} ({} bytes)", name, transfer.bytes_written);
        }
        unpacked += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("Unpacked {} entries to {}", unpacked, output.display());
    Ok(())
}

fn cmd_info(archive: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = ArchiveReader::open(archive)?;

    let content_bytes: u64 = reader.entries().iter().map(|e| e.size).sum();
    println!("Archive:     {}", archive.display());
    println!("File size:   {} bytes", reader.file_size());
    println!("Heap start:  {}", reader.heap_start());
    println!(
        "Table size:  {} bytes",
        reader.heap_start() - dpac_archive::HEADER_LEN
    );
    println!("Entries:     {}", reader.len());
    println!("Content:     {} bytes", content_bytes);
    if let Some(largest) = reader.entries().iter().max_by_key(|e| e.size) {
        println!("Largest:     {} ({} bytes)", largest.name, largest.size);
    }
    Ok(())
}
