fn main() -> anyhow::Result<()> {
    vfxbin::cli::run_cli()
}
