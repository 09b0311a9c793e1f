//! Utility functions for the CLI.

use dpac_core::entry::Entry;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Component, Path, PathBuf};

/// A file slated for packing: (entry name, source path, size in bytes).
pub type PackSource = (String, PathBuf, u64);

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Walk a directory tree and collect every regular file under it.
///
/// Entry names are the `/`-separated paths relative to `root` with a
/// leading `/`, independent of the host path separator, so archives built
/// on different platforms index identically. The result is sorted by name
/// for a deterministic table order.
pub fn collect_files(root: &Path) -> io::Result<Vec<PackSource>> {
    let mut sources = Vec::new();
    collect_into(root, root, &mut sources)?;
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sources)
}

fn collect_into(root: &Path, dir: &Path, sources: &mut Vec<PackSource>) -> io::Result<()> {
    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        let file_type = dir_entry.file_type()?;
        if file_type.is_dir() {
            collect_into(root, &path, sources)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let mut name = String::new();
            for component in relative.components() {
                name.push('/');
                name.push_str(&component.as_os_str().to_string_lossy());
            }
            let size = dir_entry.metadata()?.len();
            sources.push((name, path, size));
        }
        // Symlinks and special files are skipped.
    }
    Ok(())
}

/// Map an entry name to a safe relative path under an output directory.
///
/// Returns `None` for names that would escape the output directory
/// (absolute after stripping the leading slash, or containing `..`).
pub fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let trimmed = name.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let path = PathBuf::from(trimmed);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(path)
}

/// Print entries in a formatted table.
pub fn print_entries(entries: &[Entry], verbose: bool) {
    if verbose {
        println!("{:>12} {:>12}  Name", "Size", "Offset");
        println!("{}", "-".repeat(50));

        let mut total_size = 0u64;
        for entry in entries {
            println!("{:>12} {:>12}  {}", entry.size, entry.offset, entry.name);
            total_size += entry.size;
        }

        println!("{}", "-".repeat(50));
        println!("{:>12}               {} entries", total_size, entries.len());
    } else {
        for entry in entries {
            println!("{}", entry.name);
        }
    }
}
