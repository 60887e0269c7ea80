fn main() -> anyhow::Result<()> {
    docbrowse::cli::run()
}
