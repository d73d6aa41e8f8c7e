fn main() {
    #[cfg(feature = "cli")]
    vlqmap::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("vlqmap: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
