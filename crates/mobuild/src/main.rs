fn main() -> anyhow::Result<()> {
    mobuild::run()
}
