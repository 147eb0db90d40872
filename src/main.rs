//! mixid CLI entry point.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

fn main() {
    if let Err(e) = mixid::run() {
        eprintln!("error: {}", e.display_chain());
        let code = if matches!(e, mixid::Error::Cancelled) { 130 } else { 1 };
        std::process::exit(code);
    }
}
