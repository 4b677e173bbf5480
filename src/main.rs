fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(first) = args.next() else {
        return mq_bridge::run_stdio_server();
    };

    match first.as_str() {
        "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        // Some clients append `--stdio` unconditionally.
        "--stdio" => mq_bridge::run_stdio_server(),
        other => Err(anyhow::anyhow!("unknown argument {other}")),
    }
}

fn print_usage() {
    eprintln!(
        "Usage:\n  mq-bridge [--stdio]\n\n\
         Environment:\n  \
         METAEDITOR_PATH            path to metaeditor.exe (default ../metaeditor.exe)\n  \
         MQ_BRIDGE_DATA_DIR         directory for the compile log and wine shim\n  \
         MQ_BRIDGE_COMPILE_TIMEOUT  SECONDS, Ns/Nm/Nh or off (default 60s)\n  \
         RUST_LOG                   log filter written to stderr\n"
    );
}

fn print_version() {
    println!("mq-bridge {}", env!("CARGO_PKG_VERSION"));
}
