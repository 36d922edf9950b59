fn main() {
    if let Err(err) = segroute::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
