//! Demonstration harness for `blockfs`, analogous to the original's
//! `trysd`/`tryfs` scratch programs: create a disk image, stuff some
//! files into it, list and print them back. Not part of the library;
//! exists so the on-disk format can be poked at from a shell.

use std::path::PathBuf;
use std::process::ExitCode;

use blockfs::{FileBackedDisk, FileSystem, OpenMode};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blockfs")]
#[command(about = "Inspect and populate a blockfs disk image")]
struct Cli {
    /// Path to the disk image file.
    #[arg(short, long, default_value = "blockfs.img")]
    image: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh, empty disk image at the given path.
    Format,
    /// Copy a host file into the image under `name`.
    Put {
        /// Host file to read from.
        source: PathBuf,
        /// Name to store it under; defaults to the source file's name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a stored file's contents to stdout.
    Cat { name: String },
    /// List every file in the image with its size.
    Ls,
    /// Remove a stored file.
    Rm { name: String },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Format => format(&cli.image),
        Command::Put { source, name } => put(&cli.image, source, name.as_deref()),
        Command::Cat { name } => cat(&cli.image, name),
        Command::Ls => ls(&cli.image),
        Command::Rm { name } => rm(&cli.image, name),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("blockfs: {e}");
            ExitCode::FAILURE
        }
    }
}

fn format(image: &PathBuf) -> Result<(), String> {
    FileBackedDisk::create(image).map_err(|e| e.to_string())?;
    println!("formatted {}", image.display());
    Ok(())
}

fn mount(image: &PathBuf) -> Result<FileSystem<FileBackedDisk>, String> {
    let device = FileBackedDisk::open(image).map_err(|e| e.to_string())?;
    FileSystem::mount(device).map_err(|e| e.to_string())
}

fn put(image: &PathBuf, source: &PathBuf, name: Option<&str>) -> Result<(), String> {
    let name = name
        .map(str::to_string)
        .or_else(|| source.file_name().map(|n| n.to_string_lossy().into_owned()))
        .ok_or("source path has no file name")?;
    let contents = std::fs::read(source).map_err(|e| e.to_string())?;

    let mut fs = mount(image)?;
    let mut handle = fs.create_file(name.as_bytes()).map_err(|e| e.to_string())?;
    let mut written = 0;
    while written < contents.len() {
        let n = fs.write_file(&mut handle, &contents[written..]);
        if n == 0 {
            let reason = fs.last_error().map(|e| e.to_string()).unwrap_or_default();
            fs.close_file(handle).ok();
            return Err(format!("short write after {written} byte(s): {reason}"));
        }
        written += n;
    }
    fs.close_file(handle).map_err(|e| e.to_string())?;
    println!("wrote {written} byte(s) to {name}");
    Ok(())
}

fn cat(image: &PathBuf, name: &str) -> Result<(), String> {
    let mut fs = mount(image)?;
    let mut handle = fs
        .open_file(name.as_bytes(), OpenMode::ReadOnly)
        .map_err(|e| e.to_string())?;
    let length = fs.file_length(&handle).map_err(|e| e.to_string())?;

    let mut remaining = length;
    let mut buf = [0u8; 512];
    while remaining > 0 {
        let n = fs.read_file(&mut handle, &mut buf[..remaining.min(buf.len())]);
        if n == 0 {
            break;
        }
        use std::io::Write as _;
        std::io::stdout().write_all(&buf[..n]).map_err(|e| e.to_string())?;
        remaining -= n;
    }
    fs.close_file(handle).map_err(|e| e.to_string())?;
    Ok(())
}

fn ls(image: &PathBuf) -> Result<(), String> {
    let fs = mount(image)?;
    for (name, size) in fs.list_files() {
        println!("{size:>8}  {name}");
    }
    Ok(())
}

fn rm(image: &PathBuf, name: &str) -> Result<(), String> {
    let mut fs = mount(image)?;
    fs.delete_file(name.as_bytes()).map_err(|e| e.to_string())?;
    println!("removed {name}");
    Ok(())
}
