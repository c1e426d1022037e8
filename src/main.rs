fn main() -> anyhow::Result<()> {
    bxkr_lib::run()
}
