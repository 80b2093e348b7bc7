mod platform;

fn main() -> anyhow::Result<()> {
    platform::run_app(std::env::args_os().nth(1).map(Into::into))
}
