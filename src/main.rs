use clap::Parser;

mod output;
mod tty;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Takes no arguments: run it from the root of the site's source repository.
#[derive(Parser)]
#[command(name = "ghpages-push")]
#[command(version = VERSION)]
#[command(about = "Build the site, publish it to the pages repository, bump its version and tag the release")]
struct Cli {}

fn main() -> std::process::ExitCode {
    let _cli = Cli::parse();

    tty::status("ghpages-push is working...");

    let result = std::env::current_dir()
        .map_err(|e| {
            ghpages_push::Error::internal_io(
                e.to_string(),
                Some("resolve current directory".to_string()),
            )
        })
        .and_then(|source_dir| ghpages_push::deploy::run_in(&source_dir));

    let exit_code = output::print_result(result);
    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
