//! Man page generator for ardpicprog
//!
//! Writes `ardpicprog.1` plus one `ardpicprog-<command>.1` page per
//! subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [--output-dir DIR]

use clap::{Command, CommandFactory, Parser};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

#[derive(Parser)]
#[command(name = "gen-manpage", about = "Generate ardpicprog man pages")]
struct Args {
    /// Directory the pages are written to
    #[arg(short, long, default_value = "man")]
    output_dir: PathBuf,
}

fn render(cmd: Command, path: &Path) -> io::Result<()> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    fs::write(path, buffer)?;
    println!("  {}", path.display());
    Ok(())
}

/// Render the top-level page and one page per subcommand into `dir`
fn generate(dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();
    let mut pages = Vec::new();

    for sub in cmd.get_subcommands() {
        let page_name = format!("{}-{}", name, sub.get_name());
        let path = dir.join(format!("{}.1", page_name));
        render(sub.clone(), &path)?;
        pages.push(path);
    }

    let path = dir.join(format!("{}.1", name));
    render(cmd, &path)?;
    pages.push(path);
    Ok(pages)
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    println!("Generating man pages in {}:", args.output_dir.display());
    let pages = generate(&args.output_dir)?;

    println!("\nTo view the main page:");
    println!("  man -l {}", args.output_dir.join("ardpicprog.1").display());
    println!("\nTo install system-wide (requires sudo):");
    println!(
        "  sudo cp {}/*.1 /usr/local/share/man/man1/",
        args.output_dir.display()
    );
    println!("  sudo mandb");
    println!("\n{} page(s) written", pages.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_pages_per_subcommand() {
        let dir = std::env::temp_dir().join(format!("ardpicprog-man-{}", std::process::id()));
        let pages = generate(&dir).unwrap();

        let names: Vec<String> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"ardpicprog.1".to_string()));
        assert!(names.contains(&"ardpicprog-read.1".to_string()));
        assert!(names.contains(&"ardpicprog-blank-check.1".to_string()));
        assert!(names.contains(&"ardpicprog-list-devices.1".to_string()));
        assert_eq!(names.len(), cli::Cli::command().get_subcommands().count() + 1);

        let read = fs::read_to_string(dir.join("ardpicprog-read.1")).unwrap();
        assert!(read.contains("output"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_output_dir_argument() {
        let args = Args::try_parse_from(["gen-manpage", "-o", "out/man"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("out/man"));
        let args = Args::try_parse_from(["gen-manpage"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("man"));
    }
}
