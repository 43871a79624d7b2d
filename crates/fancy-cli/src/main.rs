fn main() {
    let args = std::env::args_os().collect();
    if let Err(err) = fancy_core::run(args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
