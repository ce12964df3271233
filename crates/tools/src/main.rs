use std::env;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(tools::usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    let out = match cmd.as_str() {
        "place" => tools::cmd_place(&args)?,
        "check" => tools::cmd_check(&args)?,
        _ => return Err(tools::usage()),
    };
    println!("{out}");
    Ok(())
}
