//! ova2rootfs - OVA/VMDK to docker rootfs converter.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use ova2rootfs::config::Config;
use ova2rootfs::logging;
use ova2rootfs::pipeline::{self, Artifacts, Options};

/// Image name suggested in the follow-up commands.
const SUGGESTED_IMAGE: &str = "my-new-image:latest";

#[derive(Parser)]
#[command(name = "ova2rootfs", version)]
#[command(about = "Convert OVA or VMDK to Docker container format")]
#[command(after_help = "Example: ova2rootfs --input alpine_linux.ova --output ./docker_output")]
struct Cli {
    /// Input OVA or VMDK file
    #[arg(long)]
    input: PathBuf,

    /// Output directory for Docker container files
    #[arg(long)]
    output: PathBuf,

    /// Keep the raw image and extracted files in the output folder
    #[arg(long)]
    keepfiles: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    let options = Options {
        input: cli.input,
        output: cli.output,
        keep_files: cli.keepfiles,
        verbose: cli.verbose,
    };
    logging::init(options.verbose);
    let config = Config::load();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    match pipeline::convert(options, config, &mut input, &mut output) {
        Some(artifacts) => {
            print_summary(&artifacts);
            ExitCode::SUCCESS
        }
        None => {
            println!("Conversion failed or was stopped by the user.");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(artifacts: &Artifacts) {
    println!("Conversion successful.");
    if let Some(raw) = &artifacts.raw {
        println!("RAW file: {}", raw.display());
    }
    println!("Tar file: {}", artifacts.tarball.display());
    println!();
    println!("To create a Docker image, run:");
    println!(
        "docker import {} {}",
        artifacts.tarball.display(),
        SUGGESTED_IMAGE
    );
    println!();
    println!("To run the new container:");
    println!("docker run -it {} /bin/sh", SUGGESTED_IMAGE);
}
