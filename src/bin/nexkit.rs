fn main() -> anyhow::Result<()> {
    nexkit::cli::run_cli()
}
