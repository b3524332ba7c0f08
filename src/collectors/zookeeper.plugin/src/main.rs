//! Standalone binary, built as `zookeeper-plugin` and installed by netdata as `zookeeper.plugin`

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let exit_code = zookeeper_plugin::run(args);
    std::process::exit(exit_code);
}
