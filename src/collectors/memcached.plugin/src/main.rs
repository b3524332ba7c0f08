//! Standalone binary, built as `memcached-plugin` and installed by netdata as `memcached.plugin`

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let exit_code = memcached_plugin::run(args);
    std::process::exit(exit_code);
}
