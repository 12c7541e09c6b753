//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = geofeature_cli::run() {
        eprintln!("geofeature: {err}");
        std::process::exit(1);
    }
}
