fn main() {
    if let Err(err) = switchboard_cli::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
