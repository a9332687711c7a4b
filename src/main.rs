fn main() {
    #[cfg(feature = "cli")]
    midips::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("midips: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
