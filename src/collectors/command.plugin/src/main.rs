//! Standalone binary, built as `command-plugin` and installed by netdata as `command.plugin`

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let exit_code = command_plugin::run(args);
    std::process::exit(exit_code);
}
