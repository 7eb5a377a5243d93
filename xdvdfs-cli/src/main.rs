use clap::{Parser, Subcommand};

mod cmd_info;
mod cmd_trim;
mod cmd_verify;
mod progress;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a full-disc dump or existing XISO into its trimmed form.
    Trim(cmd_trim::TrimArgs),
    /// Walk an image's directory tree and read back every file's content.
    Verify(cmd_verify::VerifyArgs),
    /// Print the volume descriptor and a summary of the directory tree.
    Info(cmd_info::InfoArgs),
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Trim(args) => cmd_trim::run(args),
        Command::Verify(args) => cmd_verify::run(args),
        Command::Info(args) => cmd_info::run(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
