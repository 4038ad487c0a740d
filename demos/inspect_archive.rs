use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    shardpipe::example_apps::run_inspect_archive(std::env::args().skip(1))
}
